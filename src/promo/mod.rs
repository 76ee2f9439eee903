//! Promo-code rules: normalization, redemption checks and discount pricing.
//!
//! The HTTP handlers, the admin API and the payment webhook all go through
//! this module, so a code typed as ` taallum70 ` and one stored as
//! `TAALLUM70` always resolve to the same row.

mod usage;
mod validate;

pub use usage::*;
pub use validate::*;

use axum::http::StatusCode;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, Result};
use crate::util::round_money;

pub const MIN_CODE_LEN: usize = 3;
pub const MAX_CODE_LEN: usize = 32;

/// Why a promo code cannot be redeemed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoRejection {
    NotFound,
    Inactive,
    Expired,
    LimitReached,
}

impl PromoRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PromoRejection::NotFound => StatusCode::NOT_FOUND,
            PromoRejection::Inactive | PromoRejection::Expired | PromoRejection::LimitReached => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Stable machine-readable reason, used in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            PromoRejection::NotFound => "not_found",
            PromoRejection::Inactive => "inactive",
            PromoRejection::Expired => "expired",
            PromoRejection::LimitReached => "limit_reached",
        }
    }

    /// User-facing message shown at checkout.
    pub fn message(&self) -> &'static str {
        match self {
            PromoRejection::NotFound => "كود الخصم غير صالح",
            PromoRejection::Inactive => "كود الخصم غير مفعّل",
            PromoRejection::Expired => "انتهت صلاحية كود الخصم",
            PromoRejection::LimitReached => "تم الوصول إلى الحد الأقصى لاستخدام كود الخصم",
        }
    }
}

/// Canonical form of a promo code: NFKC (folds full-width and other
/// compatibility characters), trimmed, uppercased.
pub fn normalize_code(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    folded.trim().to_uppercase()
}

/// Normalize a code supplied by an admin and check it is storable.
pub fn normalize_new_code(raw: &str) -> Result<String> {
    let code = normalize_code(raw);
    let len = code.chars().count();
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "Code must be between {} and {} characters",
            MIN_CODE_LEN, MAX_CODE_LEN
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(
            "Code may only contain letters A-Z, digits, '-' and '_'".into(),
        ));
    }
    Ok(code)
}

/// Discount granted by a redeemable code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuote {
    pub code: String,
    pub discount_percent: i32,
    pub discount_amount: Option<f64>,
}

impl DiscountQuote {
    /// Price after the discount. A fixed amount wins over the percentage;
    /// the result never goes below zero and is rounded to 2 decimals.
    pub fn apply(&self, price: f64) -> f64 {
        let discounted = match self.discount_amount {
            Some(amount) => price - amount,
            None => price * f64::from(100 - self.discount_percent) / 100.0,
        };
        round_money(discounted.max(0.0))
    }
}

/// Reject NaN, infinities and negative amounts.
pub fn check_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::BadRequest(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}
