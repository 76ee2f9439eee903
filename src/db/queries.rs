use chrono::Utc;
use rusqlite::{Connection, ErrorCode, params, types::Value};
use uuid::Uuid;

use crate::crypto::hash_secret;
use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    API_KEY_COLS, PROMO_CODE_COLS, PROMO_CODE_USAGE_COLS, USER_COLS, query_all, query_one,
};
use super::soft_delete::{restore_entity, soft_delete_entity};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// True when a statement failed on a UNIQUE (or other) constraint.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a nullable column. Outer None leaves the column alone,
    /// `Some(None)` sets it to NULL.
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<Option<V>>) -> Self {
        match value {
            Some(Some(v)) => self.fields.push((column, v.into())),
            Some(None) => self.fields.push((column, Value::Null)),
            None => {}
        }
        self
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&id, &email, &input.name, input.role.as_ref(), now, now],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::Conflict("A user with this email already exists".into())
        } else {
            e.into()
        }
    })?;

    Ok(User {
        id,
        email,
        name: input.name.clone(),
        role: input.role,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        [id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        [email.trim().to_lowercase()],
    )
}

pub fn count_admins(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

// ============ API Keys ============

/// Generate an API key with tl_ prefix
pub fn generate_api_key() -> String {
    format!("tl_{}", Uuid::new_v4().simple())
}

/// Create an API key for a user. Returns the stored record and the raw key,
/// which is never persisted.
pub fn create_api_key(conn: &Connection, user_id: &str, name: &str) -> Result<(ApiKey, String)> {
    let id = gen_id();
    let now = now();
    let key = generate_api_key();
    let prefix: String = key.chars().take(8).collect();
    let key_hash = hash_secret(&key);

    conn.execute(
        "INSERT INTO api_keys (id, user_id, name, key_prefix, key_hash, created_at, last_used_at, revoked_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL)",
        params![&id, user_id, name, &prefix, &key_hash, now],
    )?;

    Ok((
        ApiKey {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            prefix,
            key_hash,
            created_at: now,
            last_used_at: None,
            revoked_at: None,
        },
        key,
    ))
}

/// Get user by API key. Returns the user and key info if found and not revoked.
pub fn get_user_by_api_key(conn: &Connection, api_key: &str) -> Result<Option<(User, ApiKey)>> {
    let hash = hash_secret(api_key);

    let key: Option<ApiKey> = query_one(
        conn,
        &format!(
            "SELECT {} FROM api_keys WHERE key_hash = ?1 AND revoked_at IS NULL",
            API_KEY_COLS
        ),
        [&hash],
    )?;

    let Some(key) = key else {
        return Ok(None);
    };

    // Best effort; a failed timestamp update must not block authentication
    if let Err(e) = conn.execute(
        "UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2",
        params![now(), &key.id],
    ) {
        tracing::warn!("Failed to update api key last_used_at: {}", e);
    }

    Ok(get_user_by_id(conn, &key.user_id)?.map(|user| (user, key)))
}

pub fn revoke_api_key(conn: &Connection, key_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE api_keys SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
        params![now(), key_id],
    )?;
    Ok(affected > 0)
}

// ============ Promo Codes ============

/// Insert a promo code. `input.code` must already be normalized.
pub fn create_promo_code(conn: &Connection, input: &CreatePromoCode) -> Result<PromoCode> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO promo_codes (id, code, discount_percent, discount_amount, is_active, usage_count, usage_limit, expires_at, description, created_at, updated_at, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, NULL)",
        params![
            &id,
            &input.code,
            input.discount_percent,
            input.discount_amount,
            input.is_active,
            input.usage_limit,
            input.expires_at,
            &input.description,
            now,
            now
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::Conflict(format!("Promo code {} already exists", input.code))
        } else {
            e.into()
        }
    })?;

    Ok(PromoCode {
        id,
        code: input.code.clone(),
        discount_percent: input.discount_percent,
        discount_amount: input.discount_amount,
        is_active: input.is_active,
        usage_count: 0,
        usage_limit: input.usage_limit,
        expires_at: input.expires_at,
        description: input.description.clone(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Get a promo code by id, including soft-deleted ones (admin view).
pub fn get_promo_code_by_id(conn: &Connection, id: &str) -> Result<Option<PromoCode>> {
    query_one(
        conn,
        &format!("SELECT {} FROM promo_codes WHERE id = ?1", PROMO_CODE_COLS),
        [id],
    )
}

/// Exact-match lookup of a live (not deleted) code. `code` must already be normalized.
pub fn get_promo_code_by_code(conn: &Connection, code: &str) -> Result<Option<PromoCode>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM promo_codes WHERE code = ?1 AND deleted_at IS NULL",
            PROMO_CODE_COLS
        ),
        [code],
    )
}

pub fn list_promo_codes_paginated(
    conn: &Connection,
    include_deleted: bool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PromoCode>, i64)> {
    let filter = if include_deleted {
        ""
    } else {
        "WHERE deleted_at IS NULL"
    };
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM promo_codes {}", filter),
        [],
        |row| row.get(0),
    )?;
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM promo_codes {} ORDER BY created_at DESC, code ASC LIMIT ?1 OFFSET ?2",
            PROMO_CODE_COLS, filter
        ),
        params![limit, offset],
    )?;
    Ok((items, total))
}

/// Apply a partial update. A new `code` must already be normalized.
pub fn update_promo_code(conn: &Connection, id: &str, input: &UpdatePromoCode) -> Result<bool> {
    UpdateBuilder::new("promo_codes", id)
        .with_updated_at()
        .set_opt("code", input.code.clone())
        .set_opt("discount_percent", input.discount_percent)
        .set_nullable("discount_amount", input.discount_amount)
        .set_opt("is_active", input.is_active)
        .set_nullable("usage_limit", input.usage_limit)
        .set_nullable("expires_at", input.expires_at)
        .set_nullable("description", input.description.clone())
        .execute(conn)
        .map_err(|e| match e {
            AppError::Database(ref db) if is_constraint_violation(db) => {
                AppError::Conflict("Promo code already exists".into())
            }
            other => other,
        })
}

pub fn set_promo_code_active(conn: &Connection, id: &str, active: bool) -> Result<bool> {
    UpdateBuilder::new("promo_codes", id)
        .with_updated_at()
        .set("is_active", active)
        .execute(conn)
}

/// Soft-delete a promo code. Usage rows keep referencing it.
pub fn delete_promo_code(conn: &Connection, id: &str) -> Result<bool> {
    Ok(soft_delete_entity(conn, "promo_codes", id)?.deleted)
}

/// Restore a soft-deleted code. Fails with Conflict when a live code with the
/// same name was created in the meantime.
pub fn restore_promo_code(conn: &Connection, id: &str) -> Result<bool> {
    restore_entity(conn, "promo_codes", id).map_err(|e| match e {
        AppError::Database(ref db) if is_constraint_violation(db) => {
            AppError::Conflict("Another live promo code uses this code".into())
        }
        other => other,
    })
}

/// Increment the usage counter unless the limit is already reached.
///
/// Single conditional UPDATE: the limit check and the increment happen in
/// one statement, so concurrent callers cannot both pass the check.
/// Returns false when the code is missing or exhausted.
pub fn increment_usage_if_below_limit(conn: &Connection, promo_code_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE promo_codes
         SET usage_count = usage_count + 1, updated_at = ?1
         WHERE id = ?2 AND (usage_limit IS NULL OR usage_count < usage_limit)",
        params![now(), promo_code_id],
    )?;
    Ok(affected > 0)
}

pub fn create_promo_code_usage(
    conn: &Connection,
    promo_code_id: &str,
    user_id: &str,
    price_paid: f64,
    original_price: f64,
) -> Result<PromoCodeUsage> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO promo_code_usages (id, promo_code_id, user_id, price_paid, original_price, used_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&id, promo_code_id, user_id, price_paid, original_price, now],
    )?;

    Ok(PromoCodeUsage {
        id,
        promo_code_id: promo_code_id.to_string(),
        user_id: user_id.to_string(),
        price_paid,
        original_price,
        used_at: now,
    })
}

pub fn count_usages_for_promo_code(conn: &Connection, promo_code_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM promo_code_usages WHERE promo_code_id = ?1",
        params![promo_code_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

pub fn list_usages_for_promo_code_paginated(
    conn: &Connection,
    promo_code_id: &str,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PromoCodeUsage>, i64)> {
    let total = count_usages_for_promo_code(conn, promo_code_id)?;
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM promo_code_usages WHERE promo_code_id = ?1
             ORDER BY used_at DESC, id ASC LIMIT ?2 OFFSET ?3",
            PROMO_CODE_USAGE_COLS
        ),
        params![promo_code_id, limit, offset],
    )?;
    Ok((items, total))
}

// ============ Webhook Event Deduplication ============

/// Atomically record a webhook event, returning true if this is a new event.
/// Returns false if the event was already processed.
///
/// Uses INSERT OR IGNORE for atomicity - if the (provider, event_id) pair
/// already exists, the insert is silently ignored and we return false.
pub fn try_record_webhook_event(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let id = gen_id();
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (id, provider, event_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, provider, event_id, now()],
    )?;
    Ok(affected > 0)
}
