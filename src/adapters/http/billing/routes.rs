//! HTTP routes for billing notifications.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{health, receive_billing_webhook, BillingAppState};

/// Creates the billing router: the webhook endpoint plus a health probe.
pub fn billing_router(state: BillingAppState) -> Router {
    Router::new()
        .route("/api/webhooks/billing", post(receive_billing_webhook))
        .route("/health", get(health))
        .with_state(state)
}
