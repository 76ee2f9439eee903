//! Admin account provisioning for the CLI and first start.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{CreateUser, User, UserRole};

/// Create an admin (or reuse an existing admin with this email) and issue a
/// fresh API key. Returns the raw key, which is not stored anywhere.
pub fn create_admin(conn: &Connection, email: &str, name: &str) -> Result<(User, String)> {
    let user = match queries::get_user_by_email(conn, email)? {
        Some(user) if user.role == UserRole::Admin => user,
        Some(_) => {
            return Err(AppError::Conflict(format!(
                "User {} exists and is not an admin",
                email.trim()
            )));
        }
        None => queries::create_user(
            conn,
            &CreateUser {
                email: email.to_string(),
                name: name.to_string(),
                role: UserRole::Admin,
            },
        )?,
    };

    let (_key, raw_key) = queries::create_api_key(conn, &user.id, "admin")?;
    Ok((user, raw_key))
}

/// Create the first admin when none exists. Returns the raw API key when an
/// admin was created.
pub fn bootstrap_admin(conn: &Connection, email: &str) -> Result<Option<String>> {
    if queries::count_admins(conn)? > 0 {
        return Ok(None);
    }
    let name = email.split('@').next().unwrap_or(email);
    let (user, raw_key) = create_admin(conn, email, name)?;
    tracing::info!(user_id = %user.id, "Bootstrapped first admin {}", user.email);
    Ok(Some(raw_key))
}
