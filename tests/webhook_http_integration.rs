//! Integration tests for the billing webhook HTTP endpoint.
//!
//! These tests exercise the full router:
//! 1. Status codes and response bodies match what the provider expects
//! 2. Signature verification guards the endpoint when a secret is configured
//! 3. Owner hints and legacy query parameters reach the dispatcher

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use tenant_billing::adapters::http::{billing_router, BillingAppState};
use tenant_billing::adapters::memory::{InMemoryBillingStore, InMemoryIdentityService};
use tenant_billing::adapters::mercadopago::MockPaymentProvider;
use tenant_billing::application::{BillingPorts, DispatchWebhookHandler, ProvisioningSettings};
use tenant_billing::domain::billing::{
    hex_encode, manifest, ExternalReference, TenantOwner, WebhookSignatureVerifier,
};
use tenant_billing::domain::foundation::{TenantId, Timestamp};
use tenant_billing::ports::ProviderPayment;

const SECRET: &str = "whsec_http";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    store: Arc<InMemoryBillingStore>,
    provider: MockPaymentProvider,
    app: Router,
}

fn harness(secret: Option<&str>) -> Harness {
    let store = Arc::new(InMemoryBillingStore::new());
    let provider = MockPaymentProvider::new();
    let mut dispatcher = DispatchWebhookHandler::from_ports(
        BillingPorts {
            owners: store.clone(),
            tenants: store.clone(),
            ledger: store.clone(),
            leads: store.clone(),
            setup: store.clone(),
            provider: Arc::new(provider.clone()),
            identity: Arc::new(InMemoryIdentityService::new()),
        },
        ProvisioningSettings::default(),
    );
    if let Some(secret) = secret {
        dispatcher = dispatcher.with_signature_verifier(WebhookSignatureVerifier::new(
            SecretString::new(secret.to_string()),
            300,
        ));
    }

    Harness {
        store,
        provider,
        app: billing_router(BillingAppState::new(Arc::new(dispatcher))),
    }
}

fn webhook(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
}

fn sign(data_id: &str, request_id: &str) -> String {
    let ts = Timestamp::now().as_datetime().timestamp().to_string();
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(manifest(Some(data_id), Some(request_id), &ts).as_bytes());
    format!("ts={},v1={}", ts, hex_encode(&mac.finalize().into_bytes()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn tenant_payment(id: &str, tenant_id: TenantId) -> ProviderPayment {
    ProviderPayment {
        id: id.to_string(),
        status: "approved".to_string(),
        status_detail: None,
        external_reference: Some(ExternalReference::tenant(tenant_id).to_string()),
        transaction_amount: 99.90,
        payment_method_id: None,
        payment_type_id: None,
        date_created: None,
        date_approved: None,
        payer_email: None,
    }
}

// =============================================================================
// Acknowledgements
// =============================================================================

#[tokio::test]
async fn event_without_data_id_returns_ignored() {
    let h = harness(None);
    let body = r#"{"type":"payment"}"#;

    let (status, json) = send(
        h.app,
        webhook("/api/webhooks/billing")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ignored");
    assert_eq!(json["reason"], "missing data.id");
    assert_eq!(h.store.write_count().await, 0);
}

#[tokio::test]
async fn unknown_tenant_payment_is_processed_as_no_op() {
    let h = harness(None);
    h.store.add_owner(TenantOwner::new("Reseller", "token-a")).await;
    h.provider
        .add_payment("token-a", tenant_payment("p-1", TenantId::new()));
    let body = r#"{"type":"payment","data":{"id":"p-1"}}"#;

    let (status, json) = send(
        h.app,
        webhook("/api/webhooks/billing")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "processed");
    assert_eq!(json["outcome"], "tenant_not_found");
    assert_eq!(h.store.write_count().await, 0);
}

#[tokio::test]
async fn owner_hint_query_parameter_narrows_owner_lookup() {
    let h = harness(None);
    h.store.add_owner(TenantOwner::new("First", "token-a")).await;
    let hinted = TenantOwner::new("Hinted", "token-h");
    h.store.add_owner(hinted.clone()).await;
    h.provider
        .add_payment("token-h", tenant_payment("p-1", TenantId::new()));
    let body = r#"{"type":"payment","data":{"id":"p-1"}}"#;

    let (status, _) = send(
        h.app,
        webhook(&format!("/api/webhooks/billing?owner_id={}", hinted.id))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let calls = h.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].access_token, "token-h");
}

// =============================================================================
// Signatures
// =============================================================================

#[tokio::test]
async fn missing_signature_is_rejected_when_secret_configured() {
    let h = harness(Some(SECRET));
    let body = r#"{"type":"payment","data":{"id":"p-1"}}"#;

    let (status, json) = send(
        h.app,
        webhook("/api/webhooks/billing")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "invalid signature");
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn malformed_event_is_acknowledged_before_signature_check() {
    let h = harness(Some(SECRET));
    let body = r#"{"type":"payment"}"#;

    let (status, json) = send(
        h.app,
        webhook("/api/webhooks/billing")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ignored");
    assert_eq!(json["reason"], "missing data.id");
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn signature_from_another_secret_is_rejected() {
    let h = harness(Some("whsec_other"));
    let body = r#"{"type":"payment","data":{"id":"p-1"}}"#;

    let (status, _) = send(
        h.app,
        webhook("/api/webhooks/billing")
            .header("x-signature", sign("p-1", "req-1"))
            .header("x-request-id", "req-1")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.write_count().await, 0);
}

#[tokio::test]
async fn valid_signature_is_accepted() {
    let h = harness(Some(SECRET));
    let body = r#"{"type":"payment","data":{"id":"p-1"}}"#;

    let (status, json) = send(
        h.app,
        webhook("/api/webhooks/billing")
            .header("x-signature", sign("p-1", "req-1"))
            .header("x-request-id", "req-1")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "owner_not_resolved");
}
