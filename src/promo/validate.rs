use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::PromoCode;

use super::{DiscountQuote, PromoRejection, normalize_code};

/// Check whether a stored code can be redeemed at `now` (unix seconds).
///
/// Conditions are checked in a fixed order and the first failure wins:
/// inactive, then expired, then limit reached.
pub fn check_redeemable(promo: &PromoCode, now: i64) -> std::result::Result<(), PromoRejection> {
    if !promo.is_active {
        return Err(PromoRejection::Inactive);
    }
    if promo.is_expired_at(now) {
        return Err(PromoRejection::Expired);
    }
    if promo.is_exhausted() {
        return Err(PromoRejection::LimitReached);
    }
    Ok(())
}

/// Resolve a raw code and quote its discount. Read-only, so checkout pages
/// may call it as often as they like before payment.
pub fn validate_code(conn: &Connection, raw_code: &str, now: i64) -> Result<DiscountQuote> {
    let code = normalize_code(raw_code);
    if code.is_empty() {
        return Err(PromoRejection::NotFound.into());
    }

    let promo =
        queries::get_promo_code_by_code(conn, &code)?.ok_or(PromoRejection::NotFound)?;

    check_redeemable(&promo, now)?;

    Ok(DiscountQuote {
        code: promo.code,
        discount_percent: promo.discount_percent,
        discount_amount: promo.discount_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo() -> PromoCode {
        PromoCode {
            id: "p1".into(),
            code: "TAALLUM70".into(),
            discount_percent: 72,
            discount_amount: None,
            is_active: true,
            usage_count: 0,
            usage_limit: None,
            expires_at: None,
            description: None,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn test_redeemable() {
        assert_eq!(check_redeemable(&promo(), 1_000), Ok(()));
    }

    #[test]
    fn test_inactive_wins_over_everything() {
        let p = PromoCode {
            is_active: false,
            expires_at: Some(0),
            usage_count: 5,
            usage_limit: Some(1),
            ..promo()
        };
        assert_eq!(check_redeemable(&p, 1_000), Err(PromoRejection::Inactive));
    }

    #[test]
    fn test_expired_before_limit() {
        let p = PromoCode {
            expires_at: Some(999),
            usage_count: 1,
            usage_limit: Some(1),
            ..promo()
        };
        assert_eq!(check_redeemable(&p, 1_000), Err(PromoRejection::Expired));
        // Exactly at the expiry instant the code still works
        let p = PromoCode {
            expires_at: Some(1_000),
            ..promo()
        };
        assert_eq!(check_redeemable(&p, 1_000), Ok(()));
    }

    #[test]
    fn test_limit_reached() {
        let p = PromoCode {
            usage_count: 1,
            usage_limit: Some(1),
            ..promo()
        };
        assert_eq!(check_redeemable(&p, 1_000), Err(PromoRejection::LimitReached));
    }
}
