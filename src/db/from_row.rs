//! Row mapping for the SQLite tables. Each `*_COLS` constant lists columns in
//! the order the matching `FromRow` impl reads them.

use rusqlite::{Connection, OptionalExtension, Params, Row, types::Type};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub const USER_COLS: &str = "id, email, name, role, created_at, updated_at";

pub const API_KEY_COLS: &str =
    "id, user_id, name, key_prefix, key_hash, created_at, last_used_at, revoked_at";

pub const PROMO_CODE_COLS: &str = "id, code, discount_percent, discount_amount, is_active, usage_count, usage_limit, expires_at, description, created_at, updated_at, deleted_at";

pub const PROMO_CODE_USAGE_COLS: &str =
    "id, promo_code_id, user_id, price_paid, original_price, used_at";

/// Parse a strum-backed enum stored as TEXT.
fn parse_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            role: parse_enum(row, 3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl FromRow for ApiKey {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ApiKey {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            prefix: row.get(3)?,
            key_hash: row.get(4)?,
            created_at: row.get(5)?,
            last_used_at: row.get(6)?,
            revoked_at: row.get(7)?,
        })
    }
}

impl FromRow for PromoCode {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PromoCode {
            id: row.get(0)?,
            code: row.get(1)?,
            discount_percent: row.get(2)?,
            discount_amount: row.get(3)?,
            is_active: row.get(4)?,
            usage_count: row.get(5)?,
            usage_limit: row.get(6)?,
            expires_at: row.get(7)?,
            description: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            deleted_at: row.get(11)?,
        })
    }
}

impl FromRow for PromoCodeUsage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PromoCodeUsage {
            id: row.get(0)?,
            promo_code_id: row.get(1)?,
            user_id: row.get(2)?,
            price_paid: row.get(3)?,
            original_price: row.get(4)?,
            used_at: row.get(5)?,
        })
    }
}

pub fn query_one<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Option<T>> {
    let row = conn.query_row(sql, params, T::from_row).optional()?;
    Ok(row)
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
