use std::sync::{Arc, Barrier};
use std::thread;

use taallum::error::AppError;
use taallum::promo::{PromoRejection, RecordUsage, record_usage, record_usage_for_event};

use crate::common::*;

fn usage_input(code: &str, user_id: &str) -> RecordUsage {
    RecordUsage {
        code: code.to_string(),
        user_id: user_id.to_string(),
        price_paid: 28.0,
        original_price: 100.0,
    }
}

#[test]
fn test_record_usage_increments_by_one_and_inserts_one_row() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");
    let promo = create_test_promo(&conn, promo_input("TAALLUM70", 72));

    let usage = record_usage(&mut conn, &usage_input("taallum70", &user.id)).unwrap();

    assert_eq!(usage.promo_code_id, promo.id);
    assert_eq!(usage.user_id, user.id);
    assert_eq!(usage.price_paid, 28.0);
    assert_eq!(usage.original_price, 100.0);
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 1);
    assert_eq!(queries::count_usages_for_promo_code(&conn, &promo.id).unwrap(), 1);
}

#[test]
fn test_counter_matches_usage_rows() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");
    let promo = create_test_promo(&conn, promo_input("TAALLUM70", 72));

    for _ in 0..7 {
        record_usage(&mut conn, &usage_input("TAALLUM70", &user.id)).unwrap();
    }

    assert_eq!(get_promo(&conn, &promo.id).usage_count, 7);
    assert_eq!(queries::count_usages_for_promo_code(&conn, &promo.id).unwrap(), 7);
}

#[test]
fn test_record_usage_unknown_code() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");

    let result = record_usage(&mut conn, &usage_input("MISSING", &user.id));
    assert!(matches!(result, Err(AppError::Promo(PromoRejection::NotFound))));
}

#[test]
fn test_record_usage_unknown_user_leaves_counter_alone() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let promo = create_test_promo(&conn, promo_input("TAALLUM70", 72));

    let result = record_usage(&mut conn, &usage_input("TAALLUM70", "no-such-user"));
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 0);
}

#[test]
fn test_record_usage_rejects_invalid_amounts() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");
    create_test_promo(&conn, promo_input("TAALLUM70", 72));

    let input = RecordUsage {
        price_paid: -1.0,
        ..usage_input("TAALLUM70", &user.id)
    };
    assert!(matches!(
        record_usage(&mut conn, &input),
        Err(AppError::BadRequest(_))
    ));

    let input = RecordUsage {
        user_id: "  ".to_string(),
        ..usage_input("TAALLUM70", &user.id)
    };
    assert!(matches!(
        record_usage(&mut conn, &input),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn test_record_usage_stops_at_limit() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");
    let promo = create_test_promo(
        &conn,
        CreatePromoCode {
            usage_limit: Some(2),
            ..promo_input("TWICE", 40)
        },
    );

    record_usage(&mut conn, &usage_input("TWICE", &user.id)).unwrap();
    record_usage(&mut conn, &usage_input("TWICE", &user.id)).unwrap();
    let third = record_usage(&mut conn, &usage_input("TWICE", &user.id));

    assert!(matches!(third, Err(AppError::Promo(PromoRejection::LimitReached))));
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 2);
    assert_eq!(queries::count_usages_for_promo_code(&conn, &promo.id).unwrap(), 2);
}

#[test]
fn test_concurrent_recordings_cannot_exceed_limit() {
    let ctx = test_context();
    let (user, promo) = {
        let conn = ctx.conn();
        let user = create_test_user(&conn, "student@taallum.test");
        let promo = create_test_promo(
            &conn,
            CreatePromoCode {
                usage_limit: Some(1),
                ..promo_input("ONCE", 50)
            },
        );
        (user, promo)
    };

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let pool = ctx.state.db.clone();
            let barrier = barrier.clone();
            let user_id = user.id.clone();
            thread::spawn(move || {
                let mut conn = pool.get().unwrap();
                barrier.wait();
                record_usage(&mut conn, &usage_input("ONCE", &user_id))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let limit_rejections = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Promo(PromoRejection::LimitReached))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(limit_rejections, 1);

    let conn = ctx.conn();
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 1);
    assert_eq!(queries::count_usages_for_promo_code(&conn, &promo.id).unwrap(), 1);
}

#[test]
fn test_event_recording_is_at_most_once() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");
    let promo = create_test_promo(&conn, promo_input("TAALLUM70", 72));
    let input = usage_input("TAALLUM70", &user.id);

    let first = record_usage_for_event(&mut conn, "stripe", "evt_1", &input).unwrap();
    let replay = record_usage_for_event(&mut conn, "stripe", "evt_1", &input).unwrap();
    let other = record_usage_for_event(&mut conn, "stripe", "evt_2", &input).unwrap();

    assert!(first.is_some());
    assert!(replay.is_none());
    assert!(other.is_some());
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 2);
}

#[test]
fn test_failed_event_recording_can_be_retried() {
    let ctx = test_context();
    let mut conn = ctx.conn();
    let user = create_test_user(&conn, "student@taallum.test");
    let input = usage_input("LATER", &user.id);

    // Code does not exist yet: nothing is committed, not even the event marker
    let result = record_usage_for_event(&mut conn, "stripe", "evt_1", &input);
    assert!(matches!(result, Err(AppError::Promo(PromoRejection::NotFound))));

    let promo = create_test_promo(&conn, promo_input("LATER", 10));
    let retried = record_usage_for_event(&mut conn, "stripe", "evt_1", &input).unwrap();
    assert!(retried.is_some());
    assert_eq!(get_promo(&conn, &promo.id).usage_count, 1);
}
