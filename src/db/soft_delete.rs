//! Soft-delete and restore helpers.
//!
//! Promo codes are referenced by their usage rows, so admin deletion only
//! sets `deleted_at`. Lookups filter on `deleted_at IS NULL`; a restore clears
//! it again.

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::Result;

/// Result of a soft-delete operation.
#[derive(Debug, Clone, Copy)]
pub struct SoftDeleteResult {
    /// Whether the entity was found (and not already deleted)
    pub deleted: bool,
    pub deleted_at: i64,
}

/// Soft-delete an entity by ID. Already-deleted rows are left untouched.
pub fn soft_delete_entity(conn: &Connection, table: &str, id: &str) -> Result<SoftDeleteResult> {
    let now = Utc::now().timestamp();
    let sql = format!(
        "UPDATE {} SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        table
    );
    let updated = conn.execute(&sql, params![now, id])?;
    Ok(SoftDeleteResult {
        deleted: updated > 0,
        deleted_at: now,
    })
}

/// Clear `deleted_at` on a soft-deleted entity. Returns false if the row does
/// not exist or was not deleted.
pub fn restore_entity(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!(
        "UPDATE {} SET deleted_at = NULL, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NOT NULL",
        table
    );
    let updated = conn.execute(&sql, params![Utc::now().timestamp(), id])?;
    Ok(updated > 0)
}
