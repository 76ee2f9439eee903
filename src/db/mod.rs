mod from_row;
pub mod queries;
pub mod soft_delete;

pub use from_row::{FromRow, query_all, query_one};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Signing secret for Stripe webhooks; the webhook endpoint refuses events when unset
    pub stripe_webhook_secret: Option<String>,
}

const CONNECTION_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
    PRAGMA journal_mode = WAL;
";

/// Open a connection pool on a SQLite file. Every connection enforces foreign
/// keys and waits on locks instead of failing immediately.
pub fn create_pool(path: &str, max_size: u32) -> Result<DbPool> {
    let manager =
        SqliteConnectionManager::file(path).with_init(|c| c.execute_batch(CONNECTION_PRAGMAS));
    let pool = Pool::builder().max_size(max_size).build(manager)?;
    Ok(pool)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('student', 'admin')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS api_keys (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            key_prefix TEXT NOT NULL,
            key_hash TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            last_used_at INTEGER,
            revoked_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_api_keys_user ON api_keys(user_id);

        CREATE TABLE IF NOT EXISTS promo_codes (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            discount_percent INTEGER NOT NULL CHECK (discount_percent BETWEEN 1 AND 100),
            discount_amount REAL CHECK (discount_amount IS NULL OR discount_amount >= 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            usage_count INTEGER NOT NULL DEFAULT 0 CHECK (usage_count >= 0),
            usage_limit INTEGER CHECK (usage_limit IS NULL OR usage_limit >= 1),
            expires_at INTEGER,
            description TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_promo_codes_live_code
            ON promo_codes(code) WHERE deleted_at IS NULL;

        CREATE TABLE IF NOT EXISTS promo_code_usages (
            id TEXT PRIMARY KEY,
            promo_code_id TEXT NOT NULL REFERENCES promo_codes(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            price_paid REAL NOT NULL,
            original_price REAL NOT NULL,
            used_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_promo_code_usages_code ON promo_code_usages(promo_code_id);
        CREATE INDEX IF NOT EXISTS idx_promo_code_usages_user ON promo_code_usages(user_id);

        CREATE TABLE IF NOT EXISTS webhook_events (
            id TEXT PRIMARY KEY,
            provider TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (provider, event_id)
        );
        ",
    )?;
    Ok(())
}
