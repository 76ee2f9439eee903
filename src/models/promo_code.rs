use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: String,
    /// Always stored normalized (see `promo::normalize_code`)
    pub code: String,
    pub discount_percent: i32,
    /// Fixed discount; takes precedence over the percentage when pricing
    pub discount_amount: Option<f64>,
    pub is_active: bool,
    pub usage_count: i64,
    /// None = unlimited
    pub usage_limit: Option<i64>,
    pub expires_at: Option<i64>,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl PromoCode {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoCode {
    pub code: String,
    pub discount_percent: i32,
    #[serde(default)]
    pub discount_amount: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Partial update. For nullable columns, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromoCode {
    pub code: Option<String>,
    pub discount_percent: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub discount_amount: Option<Option<f64>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub usage_limit: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
