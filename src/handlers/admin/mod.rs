mod promo_codes;

pub use promo_codes::*;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::db::AppState;
use crate::middleware::require_admin;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/promo-codes",
            post(create_promo_code).get(list_promo_codes),
        )
        .route(
            "/api/admin/promo-codes/{id}",
            get(get_promo_code)
                .put(update_promo_code)
                .delete(delete_promo_code),
        )
        .route("/api/admin/promo-codes/{id}/toggle", post(toggle_promo_code))
        .route("/api/admin/promo-codes/{id}/restore", post(restore_promo_code))
        .route("/api/admin/promo-codes/{id}/usages", get(list_promo_code_usages))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
