use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::PromoCodeUsage;

use super::{PromoRejection, check_amount, normalize_code};

/// One redemption to record after a successful payment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsage {
    pub code: String,
    pub user_id: String,
    pub price_paid: f64,
    pub original_price: f64,
}

impl RecordUsage {
    fn check(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(AppError::BadRequest("code is required".into()));
        }
        if self.user_id.trim().is_empty() {
            return Err(AppError::BadRequest("userId is required".into()));
        }
        check_amount("pricePaid", self.price_paid)?;
        check_amount("originalPrice", self.original_price)?;
        Ok(())
    }
}

/// Record one redemption: increments `usage_count` by exactly one and inserts
/// exactly one usage row, both in the same transaction.
///
/// Not idempotent: two calls record two redemptions. Payment webhooks should
/// go through [`record_usage_for_event`] instead.
pub fn record_usage(conn: &mut Connection, input: &RecordUsage) -> Result<PromoCodeUsage> {
    input.check()?;

    // IMMEDIATE takes the write lock up front so concurrent recorders queue
    // behind each other instead of failing on lock upgrade.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let usage = record_in_tx(&tx, input)?;
    tx.commit()?;

    tracing::info!(
        usage_id = %usage.id,
        promo_code_id = %usage.promo_code_id,
        user_id = %usage.user_id,
        "Promo code usage recorded"
    );
    Ok(usage)
}

/// Record a redemption at most once per `(provider, event_id)`.
///
/// Returns `Ok(None)` when the event was already processed. The event marker
/// and the usage row commit together, so a failed recording can be retried
/// by the provider.
pub fn record_usage_for_event(
    conn: &mut Connection,
    provider: &str,
    event_id: &str,
    input: &RecordUsage,
) -> Result<Option<PromoCodeUsage>> {
    input.check()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !queries::try_record_webhook_event(&tx, provider, event_id)? {
        return Ok(None);
    }
    let usage = record_in_tx(&tx, input)?;
    tx.commit()?;

    tracing::info!(
        usage_id = %usage.id,
        promo_code_id = %usage.promo_code_id,
        provider,
        event_id,
        "Promo code usage recorded from payment event"
    );
    Ok(Some(usage))
}

fn record_in_tx(tx: &Transaction<'_>, input: &RecordUsage) -> Result<PromoCodeUsage> {
    // Re-resolve by code; ids from an earlier validation may be stale.
    let code = normalize_code(&input.code);
    let promo = queries::get_promo_code_by_code(tx, &code)?.ok_or(PromoRejection::NotFound)?;

    let user_id = input.user_id.trim();
    if queries::get_user_by_id(tx, user_id)?.is_none() {
        return Err(AppError::NotFound("المستخدم غير موجود".into()));
    }

    if !queries::increment_usage_if_below_limit(tx, &promo.id)? {
        tracing::warn!(code = %promo.code, "Promo code usage rejected: limit reached");
        return Err(PromoRejection::LimitReached.into());
    }

    queries::create_promo_code_usage(
        tx,
        &promo.id,
        user_id,
        input.price_paid,
        input.original_price,
    )
}
