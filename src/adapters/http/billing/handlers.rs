//! HTTP handlers for the billing webhook endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{DispatchWebhookHandler, WebhookCommand};
use crate::domain::billing::WebhookError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAckResponse, WebhookQuery};

const SIGNATURE_HEADER: &str = "x-signature";
const REQUEST_ID_HEADER: &str = "x-request-id";

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct BillingAppState {
    dispatcher: Arc<DispatchWebhookHandler>,
}

impl BillingAppState {
    pub fn new(dispatcher: Arc<DispatchWebhookHandler>) -> Self {
        Self { dispatcher }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/billing - Receive a provider notification
///
/// The body is taken raw so that a non-JSON payload is acknowledged instead
/// of rejected by an extractor.
pub async fn receive_billing_webhook(
    State(state): State<BillingAppState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let cmd = WebhookCommand {
        body: body.to_vec(),
        query_topic: query.topic(),
        query_id: query.resource_id(),
        owner_hint: query.owner_id.clone(),
        signature: header_value(&headers, SIGNATURE_HEADER),
        request_id: header_value(&headers, REQUEST_ID_HEADER),
    };

    match state.dispatcher.handle(cmd).await {
        Ok(outcome) => {
            (StatusCode::OK, Json(WebhookAckResponse::from(&outcome))).into_response()
        }
        Err(err) => handle_webhook_error(err),
    }
}

/// GET /health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn handle_webhook_error(err: WebhookError) -> Response {
    let status = err.status_code();
    if status == StatusCode::UNAUTHORIZED {
        return (status, Json(ErrorResponse::invalid_signature())).into_response();
    }

    tracing::error!(
        error = %err,
        retryable = err.is_retryable(),
        "Billing webhook failed; provider will redeliver"
    );
    (status, Json(ErrorResponse::internal(err.to_string()))).into_response()
}
