use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::crypto::constant_time_eq;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook before it is treated as a replay.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeWebhookVerifier {
    webhook_secret: String,
}

impl StripeWebhookVerifier {
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Verify a `stripe-signature` header (`t=<ts>,v1=<hex>[,v1=<hex>...]`).
    ///
    /// Returns `Err` for a malformed header, `Ok(false)` for a signature that
    /// does not match or a timestamp outside the tolerance window.
    pub fn verify_webhook_signature(&self, payload: &[u8], header: &str) -> Result<bool> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<bool> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| AppError::BadRequest("Missing timestamp in signature".into()))?;
        if signatures.is_empty() {
            return Err(AppError::BadRequest("Missing v1 signature".into()));
        }
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid signature timestamp".into()))?;

        // Header is unauthenticated at this point; overflow counts as stale.
        let stale = now
            .checked_sub(ts)
            .map(i64::unsigned_abs)
            .is_none_or(|age| age > SIGNATURE_TOLERANCE_SECS as u64);
        if stale {
            tracing::warn!("Stripe webhook timestamp outside tolerance: {}", ts);
            return Ok(false);
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        Ok(signatures
            .iter()
            .any(|sig| constant_time_eq(expected.as_bytes(), sig.as_bytes())))
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    /// Amount charged, in minor units
    pub amount_total: Option<i64>,
    /// Amount before Stripe-side discounts, in minor units
    pub amount_subtotal: Option<i64>,
    #[serde(default)]
    pub metadata: StripeCheckoutMetadata,
}

/// Metadata the checkout orchestrator attaches when it creates the session.
/// Stripe metadata values are always strings.
#[derive(Debug, Default, Deserialize)]
pub struct StripeCheckoutMetadata {
    pub promo_code: Option<String>,
    pub user_id: Option<String>,
    pub original_price: Option<String>,
}

/// Convert Stripe minor units (cents, halalas, ...) to a decimal amount.
pub fn from_minor_units(amount: i64) -> f64 {
    amount as f64 / 100.0
}
