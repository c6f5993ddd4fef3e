//! ProcessMerchantOrderHandler - one-off checkout orders.
//!
//! Merchant orders bundle the payments of a one-off checkout. Only approved
//! payments that belong to a lead are acted on: each one is fetched in full
//! and handed to the lead payment path. Everything else is left to the
//! payment notifications the provider sends separately.

use std::sync::Arc;

use crate::domain::billing::{looks_like_lead_reference, WebhookError};
use crate::domain::foundation::TenantOwnerId;
use crate::ports::{LedgerRepository, PaymentProvider};

use super::credential_resolver::CredentialResolver;
use super::process_payment::{PaymentOutcome, ProcessPaymentHandler};

/// Command to process one merchant order notification.
#[derive(Debug, Clone)]
pub struct ProcessMerchantOrderCommand {
    pub order_id: String,
    pub owner_hint: Option<TenantOwnerId>,
}

/// Result of processing a merchant order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerchantOrderOutcome {
    /// No enabled owner can read the order.
    Unresolved,
    /// Order inspected; lead payments were delegated.
    Processed {
        /// Outcome per delegated payment id.
        delegated: Vec<(String, PaymentOutcome)>,
        /// Approved payments skipped (recorded already, or not a lead payment).
        skipped: usize,
    },
}

impl MerchantOrderOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MerchantOrderOutcome::Unresolved => "owner_not_resolved",
            MerchantOrderOutcome::Processed { delegated, .. } if delegated.is_empty() => {
                "no_lead_payments"
            }
            MerchantOrderOutcome::Processed { .. } => "lead_payments_processed",
        }
    }
}

pub struct ProcessMerchantOrderHandler {
    ledger: Arc<dyn LedgerRepository>,
    provider: Arc<dyn PaymentProvider>,
    resolver: Arc<CredentialResolver>,
    payments: Arc<ProcessPaymentHandler>,
}

impl ProcessMerchantOrderHandler {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        provider: Arc<dyn PaymentProvider>,
        resolver: Arc<CredentialResolver>,
        payments: Arc<ProcessPaymentHandler>,
    ) -> Self {
        Self {
            ledger,
            provider,
            resolver,
            payments,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessMerchantOrderCommand,
    ) -> Result<MerchantOrderOutcome, WebhookError> {
        let order_id = cmd.order_id.as_str();

        // 1. Resolve the owner through the order itself
        let provider = &self.provider;
        let resolved = self
            .resolver
            .resolve("merchant_order", order_id, cmd.owner_hint.as_ref(), |credential| async move {
                provider.fetch_merchant_order(&credential, order_id).await
            })
            .await?;

        let Some(resolved) = resolved else {
            return Ok(MerchantOrderOutcome::Unresolved);
        };
        let owner = resolved.owner;
        let order = resolved.resource;

        // An order-level reference that is not a lead rules out every payment
        if let Some(reference) = order.external_reference.as_deref() {
            if !looks_like_lead_reference(reference) {
                tracing::info!(
                    order_id,
                    owner_id = %owner.id,
                    "Merchant order is not for a lead; ignoring"
                );
                return Ok(MerchantOrderOutcome::Processed {
                    delegated: Vec::new(),
                    skipped: order.payments.iter().filter(|p| p.is_approved()).count(),
                });
            }
        }

        // 2. Delegate each approved lead payment
        let mut delegated = Vec::new();
        let mut skipped = 0;

        for summary in order.payments.iter().filter(|p| p.is_approved()) {
            if self.ledger.exists_for_payment(&summary.id).await? {
                tracing::debug!(
                    order_id,
                    payment_id = %summary.id,
                    "Order payment already recorded"
                );
                skipped += 1;
                continue;
            }

            let mut payment = match self
                .provider
                .fetch_payment(&owner.credential, &summary.id)
                .await
            {
                Ok(payment) => payment,
                Err(err) if err.is_not_found() => {
                    tracing::warn!(
                        order_id,
                        payment_id = %summary.id,
                        owner_id = %owner.id,
                        "Order payment not found at provider; skipping"
                    );
                    skipped += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if payment.external_reference.is_none() {
                payment.external_reference = order.external_reference.clone();
            }
            let is_lead = payment
                .external_reference
                .as_deref()
                .map_or(false, looks_like_lead_reference);
            if !is_lead {
                skipped += 1;
                continue;
            }

            let outcome = self.payments.process_resolved(&owner, &payment).await?;
            tracing::info!(
                order_id,
                payment_id = %payment.id,
                owner_id = %owner.id,
                outcome = outcome.label(),
                "Order payment delegated"
            );
            delegated.push((payment.id.clone(), outcome));
        }

        Ok(MerchantOrderOutcome::Processed { delegated, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, InMemoryIdentityService};
    use crate::adapters::mercadopago::MockPaymentProvider;
    use crate::application::handlers::billing::{ProvisionTenantHandler, ProvisioningSettings};
    use crate::domain::billing::{ExternalReference, Plan, TenantOwner};
    use crate::domain::foundation::{PlanId, TenantId};
    use crate::domain::provisioning::{Lead, ProvisioningStage};
    use crate::ports::{MerchantOrderPayment, ProviderMerchantOrder, ProviderPayment};

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        provider: MockPaymentProvider,
        handler: ProcessMerchantOrderHandler,
        owner: TenantOwner,
        plan: Plan,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        let provider = MockPaymentProvider::new();
        let owner = TenantOwner::new("Reseller", "token-a");
        let plan = Plan {
            id: PlanId::new(),
            name: "Essencial".to_string(),
            monthly_fee_cents: 9990,
            setup_fee_cents: None,
            trial_days: 0,
        };
        store.add_owner(owner.clone()).await;
        store.add_plan(plan.clone()).await;

        let provider_port: Arc<dyn PaymentProvider> = Arc::new(provider.clone());
        let resolver = Arc::new(CredentialResolver::new(store.clone()));
        let provisioner = Arc::new(ProvisionTenantHandler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(InMemoryIdentityService::new()),
            ProvisioningSettings::default(),
        ));
        let payments = Arc::new(ProcessPaymentHandler::new(
            store.clone(),
            store.clone(),
            provider_port.clone(),
            resolver.clone(),
            provisioner,
        ));
        let handler =
            ProcessMerchantOrderHandler::new(store.clone(), provider_port, resolver, payments);

        Fixture {
            store,
            provider,
            handler,
            owner,
            plan,
        }
    }

    fn order(reference: Option<String>, payments: Vec<(&str, &str)>) -> ProviderMerchantOrder {
        ProviderMerchantOrder {
            id: "mo-1".to_string(),
            status: Some("closed".to_string()),
            external_reference: reference,
            payments: payments
                .into_iter()
                .map(|(id, status)| MerchantOrderPayment {
                    id: id.to_string(),
                    status: status.to_string(),
                    transaction_amount: Some(199.0),
                })
                .collect(),
        }
    }

    fn payment(id: &str, reference: Option<String>) -> ProviderPayment {
        ProviderPayment {
            id: id.to_string(),
            status: "approved".to_string(),
            status_detail: None,
            external_reference: reference,
            transaction_amount: 199.0,
            payment_method_id: Some("pix".to_string()),
            payment_type_id: None,
            date_created: None,
            date_approved: None,
            payer_email: None,
        }
    }

    fn command() -> ProcessMerchantOrderCommand {
        ProcessMerchantOrderCommand {
            order_id: "mo-1".to_string(),
            owner_hint: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Lead Orders
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approved_lead_payment_is_provisioned() {
        let f = fixture().await;
        let lead = Lead::new(f.owner.id, f.plan.id, "Acme", "Ana", "a@x.com", None);
        f.store.add_lead(lead.clone()).await;
        let reference = ExternalReference::lead(lead.id).to_string();
        f.provider.add_merchant_order(
            "token-a",
            order(Some(reference.clone()), vec![("p-1", "approved"), ("p-2", "rejected")]),
        );
        f.provider
            .add_payment("token-a", payment("p-1", Some(reference)));

        let outcome = f.handler.handle(command()).await.unwrap();

        let MerchantOrderOutcome::Processed { delegated, skipped } = outcome else {
            panic!("expected processed order");
        };
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].1.label(), "tenant_provisioned");
        assert_eq!(skipped, 0);
        assert_eq!(f.provider.call_count("fetch_payment"), 1);
        let stored = f.store.lead(&lead.id).await.unwrap();
        assert_eq!(stored.provisioning_stage, ProvisioningStage::Done);
    }

    #[tokio::test]
    async fn order_reference_fills_payment_without_one() {
        let f = fixture().await;
        let lead = Lead::new(f.owner.id, f.plan.id, "Acme", "Ana", "a@x.com", None);
        f.store.add_lead(lead.clone()).await;
        let reference = ExternalReference::lead(lead.id).to_string();
        f.provider
            .add_merchant_order("token-a", order(Some(reference), vec![("p-1", "approved")]));
        f.provider.add_payment("token-a", payment("p-1", None));

        f.handler.handle(command()).await.unwrap();

        let stored = f.store.lead(&lead.id).await.unwrap();
        assert_eq!(stored.provisioning_stage, ProvisioningStage::Done);
    }

    #[tokio::test]
    async fn recorded_payments_are_not_refetched() {
        let f = fixture().await;
        let lead = Lead::new(f.owner.id, f.plan.id, "Acme", "Ana", "a@x.com", None);
        f.store.add_lead(lead.clone()).await;
        let reference = ExternalReference::lead(lead.id).to_string();
        f.provider.add_merchant_order(
            "token-a",
            order(Some(reference.clone()), vec![("p-1", "approved")]),
        );
        f.provider
            .add_payment("token-a", payment("p-1", Some(reference)));
        f.handler.handle(command()).await.unwrap();
        f.provider.clear_calls();

        let outcome = f.handler.handle(command()).await.unwrap();

        assert_eq!(
            outcome,
            MerchantOrderOutcome::Processed {
                delegated: Vec::new(),
                skipped: 1
            }
        );
        assert_eq!(f.provider.call_count("fetch_payment"), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Ignored Orders
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn tenant_order_is_ignored_without_payment_fetch() {
        let f = fixture().await;
        f.provider.add_merchant_order(
            "token-a",
            order(Some(TenantId::new().to_string()), vec![("p-1", "approved")]),
        );

        let outcome = f.handler.handle(command()).await.unwrap();

        assert_eq!(outcome.label(), "no_lead_payments");
        assert_eq!(f.provider.call_count("fetch_payment"), 0);
    }

    #[tokio::test]
    async fn unreadable_order_is_unresolved() {
        let f = fixture().await;

        let outcome = f.handler.handle(command()).await.unwrap();

        assert_eq!(outcome, MerchantOrderOutcome::Unresolved);
    }
}
