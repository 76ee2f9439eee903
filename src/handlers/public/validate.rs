use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::promo::{self, check_amount};

const VALID_MESSAGE: &str = "تم تطبيق كود الخصم بنجاح";
const INVALID_PRICE_MESSAGE: &str = "السعر غير صالح";

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    /// Optional checkout price to quote the discounted total for
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub code: String,
    pub discount_percent: i32,
    pub discount_amount: Option<f64>,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct InvalidResponse {
    pub valid: bool,
    pub message: &'static str,
}

fn invalid_price(err: &AppError) -> Response {
    tracing::debug!("Rejected validate price: {}", err);
    let body = InvalidResponse {
        valid: false,
        message: INVALID_PRICE_MESSAGE,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

pub async fn validate_promo_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    query: std::result::Result<Query<ValidateQuery>, AppError>,
) -> Result<Response> {
    let price = match query {
        Ok(Query(q)) => q.price,
        Err(e) => return Ok(invalid_price(&e)),
    };
    if let Some(p) = price
        && let Err(e) = check_amount("price", p)
    {
        return Ok(invalid_price(&e));
    }

    let conn = state.db.get()?;

    let quote = match promo::validate_code(&conn, &code, Utc::now().timestamp()) {
        Ok(quote) => quote,
        Err(AppError::Promo(rejection)) => {
            tracing::debug!(code = %code, reason = rejection.reason(), "Promo code rejected");
            let body = InvalidResponse {
                valid: false,
                message: rejection.message(),
            };
            return Ok((rejection.status_code(), Json(body)).into_response());
        }
        Err(e) => return Err(e),
    };

    let discounted_price = price.map(|p| quote.apply(p));

    Ok(Json(ValidateResponse {
        valid: true,
        code: quote.code,
        discount_percent: quote.discount_percent,
        discount_amount: quote.discount_amount,
        message: VALID_MESSAGE,
        original_price: price,
        discounted_price,
    })
    .into_response())
}
