use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::db::AppState;
use crate::payments::{
    PaymentProvider, StripeCheckoutSession, StripeWebhookEvent, StripeWebhookVerifier,
    from_minor_units,
};
use crate::promo::{self, RecordUsage};

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(secret) = state.stripe_webhook_secret.as_deref() else {
        tracing::error!("Stripe webhook received but STRIPE_WEBHOOK_SECRET is not set");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Webhook not configured");
    };

    let signature = match headers.get("stripe-signature") {
        Some(sig) => match sig.to_str() {
            Ok(s) => s,
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid signature header"),
        },
        None => return (StatusCode::BAD_REQUEST, "Missing stripe-signature header"),
    };

    match StripeWebhookVerifier::new(secret).verify_webhook_signature(&body, signature) {
        Ok(true) => {}
        Ok(false) => return (StatusCode::UNAUTHORIZED, "Invalid signature"),
        Err(e) => {
            tracing::warn!("Malformed Stripe signature header: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid signature header");
        }
    }

    let event: StripeWebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            handle_checkout_completed(&state, &event)
        }
        _ => (StatusCode::OK, "Event ignored"),
    }
}

/// Record the promo-code redemption attached to a paid checkout session.
fn handle_checkout_completed(
    state: &AppState,
    event: &StripeWebhookEvent,
) -> (StatusCode, &'static str) {
    let session: StripeCheckoutSession = match serde_json::from_value(event.data.object.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to parse checkout session: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid checkout session");
        }
    };

    if session.payment_status != "paid" {
        return (StatusCode::OK, "Payment not completed");
    }

    let Some(code) = session.metadata.promo_code.clone() else {
        return (StatusCode::OK, "No promo code");
    };
    let Some(user_id) = session.metadata.user_id.clone() else {
        tracing::warn!(session_id = %session.id, "Checkout with promo code but no user_id");
        return (StatusCode::OK, "No user ID");
    };
    let Some(amount_total) = session.amount_total else {
        tracing::warn!(
            session_id = %session.id,
            event_id = %event.id,
            "Paid checkout without amount_total; promo code not recorded"
        );
        return (StatusCode::OK, "Missing amount_total");
    };

    let price_paid = from_minor_units(amount_total);
    let original_price = original_price(&session).unwrap_or(price_paid);

    let mut conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let input = RecordUsage {
        code,
        user_id,
        price_paid,
        original_price,
    };

    match promo::record_usage_for_event(
        &mut conn,
        PaymentProvider::Stripe.as_str(),
        &event.id,
        &input,
    ) {
        Ok(Some(_)) => {
            tracing::info!(
                session_id = %session.id,
                event_id = %event.id,
                "Stripe checkout completed with promo code"
            );
            (StatusCode::OK, "OK")
        }
        Ok(None) => (StatusCode::OK, "Already processed"),
        // Retrying will not change the outcome, so acknowledge the event.
        Err(e) if !e.is_internal() => {
            tracing::warn!(
                session_id = %session.id,
                event_id = %event.id,
                "Promo code not recorded: {}",
                e
            );
            (StatusCode::OK, "Promo code not applied")
        }
        Err(e) => {
            tracing::error!("Failed to record promo code usage: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

/// Pre-discount price: explicit metadata first, then Stripe's subtotal.
fn original_price(session: &StripeCheckoutSession) -> Option<f64> {
    if let Some(raw) = &session.metadata.original_price {
        match raw.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price >= 0.0 => return Some(price),
            _ => tracing::warn!(session_id = %session.id, "Ignoring invalid original_price metadata"),
        }
    }
    session.amount_subtotal.map(from_minor_units)
}

