use serde::{Deserialize, Serialize};

/// One redemption of a promo code. Immutable once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeUsage {
    pub id: String,
    pub promo_code_id: String,
    pub user_id: String,
    pub price_paid: f64,
    pub original_price: f64,
    pub used_at: i64,
}
