//! DispatchWebhookHandler - entry point for provider notifications.
//!
//! Parses the notification envelope, optionally verifies its signature and
//! routes it by event type. Malformed and unsupported notifications are
//! acknowledged without touching storage; the provider would otherwise retry
//! them forever.

use std::sync::Arc;

use tracing::Instrument;

use crate::domain::billing::{
    BillingEventKind, WebhookEnvelope, WebhookError, WebhookSignatureVerifier,
};
use crate::domain::foundation::{TenantOwnerId, Timestamp};

use super::process_merchant_order::{
    MerchantOrderOutcome, ProcessMerchantOrderCommand, ProcessMerchantOrderHandler,
};
use super::process_payment::{PaymentOutcome, ProcessPaymentCommand, ProcessPaymentHandler};
use super::reconcile_subscription::{ReconcileSubscriptionHandler, SubscriptionOutcome};

/// A received notification, independent of the transport.
#[derive(Debug, Clone, Default)]
pub struct WebhookCommand {
    pub body: Vec<u8>,
    /// `topic` / `type` query parameter.
    pub query_topic: Option<String>,
    /// `id` / `data.id` query parameter.
    pub query_id: Option<String>,
    /// `owner_id` query parameter.
    pub owner_hint: Option<String>,
    /// `x-signature` header.
    pub signature: Option<String>,
    /// `x-request-id` header.
    pub request_id: Option<String>,
}

/// What happened to a notification that was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Subscription(SubscriptionOutcome),
    Payment(PaymentOutcome),
    MerchantOrder(MerchantOrderOutcome),
    /// Acknowledged without processing.
    Ignored { reason: String },
}

impl WebhookOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, WebhookOutcome::Ignored { .. })
    }

    pub fn label(&self) -> &str {
        match self {
            WebhookOutcome::Subscription(outcome) => outcome.label(),
            WebhookOutcome::Payment(outcome) => outcome.label(),
            WebhookOutcome::MerchantOrder(outcome) => outcome.label(),
            WebhookOutcome::Ignored { reason } => reason,
        }
    }
}

pub struct DispatchWebhookHandler {
    subscriptions: Arc<ReconcileSubscriptionHandler>,
    payments: Arc<ProcessPaymentHandler>,
    merchant_orders: Arc<ProcessMerchantOrderHandler>,
    verifier: Option<WebhookSignatureVerifier>,
}

impl DispatchWebhookHandler {
    pub fn new(
        subscriptions: Arc<ReconcileSubscriptionHandler>,
        payments: Arc<ProcessPaymentHandler>,
        merchant_orders: Arc<ProcessMerchantOrderHandler>,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            merchant_orders,
            verifier: None,
        }
    }

    /// Require a valid `x-signature` on every notification.
    pub fn with_signature_verifier(mut self, verifier: WebhookSignatureVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub async fn handle(&self, cmd: WebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        // 1. Parse, with query parameters filling gaps in the body
        let envelope = WebhookEnvelope::from_body(&cmd.body)
            .with_query_fallback(cmd.query_topic.as_deref(), cmd.query_id.as_deref());

        let event = match envelope.into_event() {
            Ok(event) => event,
            Err(malformed) => {
                tracing::warn!(reason = %malformed, "Malformed webhook; acknowledged");
                return Ok(WebhookOutcome::Ignored {
                    reason: malformed.to_string(),
                });
            }
        };

        // 2. Authenticate; a malformed envelope never gets this far
        if let Some(verifier) = &self.verifier {
            verifier
                .verify(
                    cmd.signature.as_deref(),
                    cmd.request_id.as_deref(),
                    Some(event.resource_id.as_str()),
                    Timestamp::now().as_datetime().timestamp(),
                )
                .map_err(|err| {
                    tracing::warn!(error = %err, "Rejected webhook signature");
                    err
                })?;
        }

        let owner_hint = cmd.owner_hint.as_deref().and_then(|raw| {
            match raw.parse::<TenantOwnerId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(owner_hint = raw, "Ignoring invalid owner hint");
                    None
                }
            }
        });

        let span = tracing::info_span!(
            "billing_webhook",
            event_type = %event.kind.as_str(),
            resource_id = %event.resource_id,
        );

        // 3. Route
        self.route(event.kind, event.resource_id, owner_hint)
            .instrument(span)
            .await
    }

    async fn route(
        &self,
        kind: BillingEventKind,
        resource_id: String,
        owner_hint: Option<TenantOwnerId>,
    ) -> Result<WebhookOutcome, WebhookError> {
        tracing::info!("Dispatching webhook");

        let outcome = match kind {
            BillingEventKind::SubscriptionPreapproval => {
                WebhookOutcome::Subscription(self.subscriptions.handle(&resource_id).await?)
            }
            BillingEventKind::Payment => WebhookOutcome::Payment(
                self.payments
                    .handle(ProcessPaymentCommand {
                        payment_id: resource_id,
                        owner_hint,
                    })
                    .await?,
            ),
            BillingEventKind::MerchantOrder => WebhookOutcome::MerchantOrder(
                self.merchant_orders
                    .handle(ProcessMerchantOrderCommand {
                        order_id: resource_id,
                        owner_hint,
                    })
                    .await?,
            ),
            BillingEventKind::Other(kind) => {
                tracing::info!(event_type = %kind, "Unsupported webhook type; acknowledged");
                WebhookOutcome::Ignored {
                    reason: format!("unsupported event type '{}'", kind),
                }
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, InMemoryIdentityService};
    use crate::adapters::mercadopago::MockPaymentProvider;
    use crate::application::handlers::billing::{BillingPorts, ProvisioningSettings};
    use crate::domain::billing::{hex_encode, manifest, TenantOwner};
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha256;

    const SECRET: &str = "whsec_dispatch";

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        provider: MockPaymentProvider,
        handler: DispatchWebhookHandler,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        let provider = MockPaymentProvider::new();
        store
            .add_owner(TenantOwner::new("Reseller", "token-a"))
            .await;
        let handler = DispatchWebhookHandler::from_ports(
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
        Fixture {
            store,
            provider,
            handler,
        }
    }

    fn body(json: &str) -> WebhookCommand {
        WebhookCommand {
            body: json.as_bytes().to_vec(),
            ..WebhookCommand::default()
        }
    }

    fn signed(json: &str, data_id: &str) -> WebhookCommand {
        let ts = Timestamp::now().as_datetime().timestamp().to_string();
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(manifest(Some(data_id), Some("req-1"), &ts).as_bytes());
        WebhookCommand {
            signature: Some(format!(
                "ts={},v1={}",
                ts,
                hex_encode(&mac.finalize().into_bytes())
            )),
            request_id: Some("req-1".to_string()),
            ..body(json)
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Malformed and Unsupported
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_json_is_acknowledged_without_side_effects() {
        let f = fixture().await;

        let outcome = f.handler.handle(body("{not json")).await.unwrap();

        assert!(outcome.is_ignored());
        assert_eq!(f.provider.total_calls(), 0);
        assert_eq!(f.store.write_count().await, 0);
    }

    #[tokio::test]
    async fn missing_data_id_is_acknowledged() {
        let f = fixture().await;

        let outcome = f.handler.handle(body(r#"{"type":"payment"}"#)).await.unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                reason: "missing data.id".to_string()
            }
        );
        assert_eq!(f.provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_type_is_acknowledged() {
        let f = fixture().await;

        let outcome = f
            .handler
            .handle(body(r#"{"type":"point_integration_wh","data":{"id":"1"}}"#))
            .await
            .unwrap();

        assert!(outcome.is_ignored());
        assert!(outcome.label().contains("point_integration_wh"));
        assert_eq!(f.provider.total_calls(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Routing
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_event_routes_to_payment_processor() {
        let f = fixture().await;

        let outcome = f
            .handler
            .handle(body(r#"{"type":"payment","data":{"id":123}}"#))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Payment(PaymentOutcome::Unresolved));
        assert_eq!(f.provider.calls()[0].resource_id, "123");
    }

    #[tokio::test]
    async fn query_parameters_fill_empty_body() {
        let f = fixture().await;
        let cmd = WebhookCommand {
            query_topic: Some("merchant_order".to_string()),
            query_id: Some("mo-9".to_string()),
            ..WebhookCommand::default()
        };

        let outcome = f.handler.handle(cmd).await.unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::MerchantOrder(MerchantOrderOutcome::Unresolved)
        );
        assert_eq!(f.provider.call_count("fetch_merchant_order"), 1);
    }

    #[tokio::test]
    async fn subscription_event_routes_to_reconciler() {
        let f = fixture().await;

        let outcome = f
            .handler
            .handle(body(r#"{"type":"subscription_preapproval","data":{"id":"sub-1"}}"#))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Subscription(SubscriptionOutcome::TenantNotFound)
        );
    }

    #[tokio::test]
    async fn invalid_owner_hint_is_ignored() {
        let f = fixture().await;
        let cmd = WebhookCommand {
            owner_hint: Some("not-a-uuid".to_string()),
            ..body(r#"{"type":"payment","data":{"id":"1"}}"#)
        };

        let outcome = f.handler.handle(cmd).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Payment(PaymentOutcome::Unresolved));
    }

    // ══════════════════════════════════════════════════════════════
    // Signatures
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unsigned_request_is_rejected_when_verification_enabled() {
        let f = fixture().await;
        let handler = f
            .handler
            .with_signature_verifier(WebhookSignatureVerifier::new(
                SecretString::new(SECRET.to_string()),
                300,
            ));

        let err = handler
            .handle(body(r#"{"type":"payment","data":{"id":"1"}}"#))
            .await
            .unwrap_err();

        assert_eq!(err.status_code().as_u16(), 401);
        assert_eq!(f.provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn malformed_unsigned_request_is_acknowledged_when_verification_enabled() {
        let f = fixture().await;
        let handler = f
            .handler
            .with_signature_verifier(WebhookSignatureVerifier::new(
                SecretString::new(SECRET.to_string()),
                300,
            ));

        let outcome = handler.handle(body(r#"{"type":"payment"}"#)).await.unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                reason: "missing data.id".to_string()
            }
        );
        assert_eq!(f.provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn signed_request_is_processed() {
        let f = fixture().await;
        let handler = f
            .handler
            .with_signature_verifier(WebhookSignatureVerifier::new(
                SecretString::new(SECRET.to_string()),
                300,
            ));

        let outcome = handler
            .handle(signed(r#"{"type":"payment","data":{"id":"1"}}"#, "1"))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Payment(PaymentOutcome::Unresolved));
    }
}
