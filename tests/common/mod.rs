//! Shared fixtures for integration tests.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub use rusqlite::Connection;
pub use taallum::config::Config;
pub use taallum::db::{self, AppState, queries};
pub use taallum::models::*;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const ONE_DAY: i64 = 86400;

/// App state backed by a SQLite file in a temp dir that lives as long as this value.
pub struct TestContext {
    pub state: AppState,
    _dir: TempDir,
}

impl TestContext {
    pub fn conn(&self) -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        self.state.db.get().unwrap()
    }

    pub fn app(&self) -> Router {
        taallum::handlers::app(self.state.clone(), &test_config())
    }
}

pub fn test_context() -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taallum-test.db");
    let pool = db::create_pool(path.to_str().unwrap(), 4).unwrap();
    db::init_db(&pool.get().unwrap()).unwrap();

    TestContext {
        state: AppState {
            db: pool,
            stripe_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        },
        _dir: dir,
    }
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_path: ":memory:".to_string(),
        dev_mode: false,
        bootstrap_admin_email: None,
        stripe_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        cors_origins: vec!["http://localhost:5173".to_string()],
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn create_test_user(conn: &Connection, email: &str) -> User {
    queries::create_user(
        conn,
        &CreateUser {
            email: email.to_string(),
            name: "Test Student".to_string(),
            role: UserRole::Student,
        },
    )
    .unwrap()
}

/// Create an admin and return it with a raw API key.
pub fn create_test_admin(conn: &Connection) -> (User, String) {
    taallum::bootstrap::create_admin(conn, "admin@taallum.test", "Admin").unwrap()
}

pub fn promo_input(code: &str, percent: i32) -> CreatePromoCode {
    CreatePromoCode {
        code: code.to_string(),
        discount_percent: percent,
        discount_amount: None,
        is_active: true,
        usage_limit: None,
        expires_at: None,
        description: None,
    }
}

pub fn create_test_promo(conn: &Connection, input: CreatePromoCode) -> PromoCode {
    queries::create_promo_code(conn, &input).unwrap()
}

/// Force the stored counter, for setting up limit scenarios.
pub fn set_usage_count(conn: &Connection, promo_id: &str, count: i64) {
    conn.execute(
        "UPDATE promo_codes SET usage_count = ?1 WHERE id = ?2",
        rusqlite::params![count, promo_id],
    )
    .unwrap();
}

pub fn get_promo(conn: &Connection, id: &str) -> PromoCode {
    queries::get_promo_code_by_id(conn, id).unwrap().unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed(method: &str, uri: &str, api_key: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", api_key));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
