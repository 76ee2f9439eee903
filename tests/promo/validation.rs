use taallum::error::AppError;
use taallum::promo::{DiscountQuote, PromoRejection, validate_code};

use crate::common::*;

fn rejection(result: Result<DiscountQuote, AppError>) -> PromoRejection {
    match result {
        Err(AppError::Promo(r)) => r,
        other => panic!("expected promo rejection, got {:?}", other),
    }
}

#[test]
fn test_unknown_code_is_not_found() {
    let ctx = test_context();
    let conn = ctx.conn();
    create_test_promo(&conn, promo_input("TAALLUM70", 72));

    for raw in ["NOPE", "TAALLUM7", "TAALLUM700", "", "   "] {
        assert_eq!(
            rejection(validate_code(&conn, raw, now())),
            PromoRejection::NotFound,
            "code {:?}",
            raw
        );
    }
}

#[test]
fn test_taallum70_scenario() {
    let ctx = test_context();
    let conn = ctx.conn();
    create_test_promo(&conn, promo_input("TAALLUM70", 72));

    let quote = validate_code(&conn, "TAALLUM70", now()).unwrap();
    assert_eq!(quote.code, "TAALLUM70");
    assert_eq!(quote.discount_percent, 72);
    assert_eq!(quote.discount_amount, None);
}

#[test]
fn test_lookup_is_case_and_whitespace_insensitive() {
    let ctx = test_context();
    let conn = ctx.conn();
    create_test_promo(&conn, promo_input("TAALLUM70", 72));

    assert!(validate_code(&conn, "taallum70", now()).is_ok());
    assert!(validate_code(&conn, "  TaAlLuM70\n", now()).is_ok());
}

#[test]
fn test_inactive_regardless_of_other_fields() {
    let ctx = test_context();
    let conn = ctx.conn();
    let promo = create_test_promo(
        &conn,
        CreatePromoCode {
            is_active: false,
            usage_limit: Some(1),
            expires_at: Some(now() - ONE_DAY),
            ..promo_input("OFF10", 10)
        },
    );
    set_usage_count(&conn, &promo.id, 1);

    assert_eq!(
        rejection(validate_code(&conn, "OFF10", now())),
        PromoRejection::Inactive
    );
}

#[test]
fn test_expired_yesterday() {
    let ctx = test_context();
    let conn = ctx.conn();
    create_test_promo(
        &conn,
        CreatePromoCode {
            expires_at: Some(now() - ONE_DAY),
            ..promo_input("RAMADAN", 30)
        },
    );

    assert_eq!(
        rejection(validate_code(&conn, "RAMADAN", now())),
        PromoRejection::Expired
    );
}

#[test]
fn test_future_expiry_is_valid() {
    let ctx = test_context();
    let conn = ctx.conn();
    let expires_at = now() + ONE_DAY;
    create_test_promo(
        &conn,
        CreatePromoCode {
            expires_at: Some(expires_at),
            ..promo_input("RAMADAN", 30)
        },
    );

    assert!(validate_code(&conn, "RAMADAN", expires_at).is_ok());
    assert_eq!(
        rejection(validate_code(&conn, "RAMADAN", expires_at + 1)),
        PromoRejection::Expired
    );
}

#[test]
fn test_limit_reached() {
    let ctx = test_context();
    let conn = ctx.conn();
    let promo = create_test_promo(
        &conn,
        CreatePromoCode {
            usage_limit: Some(1),
            ..promo_input("ONCE", 50)
        },
    );

    assert!(validate_code(&conn, "ONCE", now()).is_ok());

    set_usage_count(&conn, &promo.id, 1);
    assert_eq!(
        rejection(validate_code(&conn, "ONCE", now())),
        PromoRejection::LimitReached
    );
}

#[test]
fn test_validation_has_no_side_effects() {
    let ctx = test_context();
    let conn = ctx.conn();
    let promo = create_test_promo(
        &conn,
        CreatePromoCode {
            usage_limit: Some(1),
            ..promo_input("ONCE", 50)
        },
    );

    for _ in 0..5 {
        assert!(validate_code(&conn, "ONCE", now()).is_ok());
    }
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 0);
    assert_eq!(queries::count_usages_for_promo_code(&conn, &promo.id).unwrap(), 0);
}

#[test]
fn test_deleted_code_is_not_found() {
    let ctx = test_context();
    let conn = ctx.conn();
    let promo = create_test_promo(&conn, promo_input("GONE", 20));

    assert!(queries::delete_promo_code(&conn, &promo.id).unwrap());
    assert_eq!(
        rejection(validate_code(&conn, "GONE", now())),
        PromoRejection::NotFound
    );

    assert!(queries::restore_promo_code(&conn, &promo.id).unwrap());
    assert!(validate_code(&conn, "GONE", now()).is_ok());
}

#[test]
fn test_quote_prices_fixed_amount() {
    let ctx = test_context();
    let conn = ctx.conn();
    create_test_promo(
        &conn,
        CreatePromoCode {
            discount_amount: Some(25.0),
            ..promo_input("FLAT25", 10)
        },
    );

    let quote = validate_code(&conn, "flat25", now()).unwrap();
    assert_eq!(quote.discount_amount, Some(25.0));
    assert_eq!(quote.apply(100.0), 75.0);
    assert_eq!(quote.apply(20.0), 0.0);
}
