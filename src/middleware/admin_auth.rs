use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::models::{ApiKey, User};
use crate::util::extract_bearer_token;

/// Authenticated admin, inserted into request extensions by [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub user: User,
    pub api_key_id: String,
}

/// Authenticate a user from the bearer API key.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(User, ApiKey), StatusCode> {
    let api_key = extract_bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let conn = state.db.get().map_err(|e| {
        tracing::error!("DB connection error during auth: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    queries::get_user_by_api_key(&conn, api_key)
        .map_err(|e| {
            tracing::error!("API key lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (user, key) = authenticate(&state, request.headers())?;
    if !user.role.can_manage_promo_codes() {
        tracing::warn!(user_id = %user.id, "Non-admin attempted admin access");
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(AdminContext {
        user,
        api_key_id: key.id,
    });
    Ok(next.run(request).await)
}
