use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::promo::{self, RecordUsage};

#[derive(Debug, Serialize)]
pub struct UsageRecorded {
    pub success: bool,
}

/// Record a redemption after a successful payment.
///
/// The caller must invoke this at most once per payment; every call counts.
pub async fn use_promo_code(
    State(state): State<AppState>,
    Json(input): Json<RecordUsage>,
) -> Result<Json<UsageRecorded>> {
    let mut conn = state.db.get()?;
    promo::record_usage(&mut conn, &input)?;
    Ok(Json(UsageRecorded { success: true }))
}
