//! ProcessPaymentHandler - records provider payments in the tenant ledger.
//!
//! A payment is recorded at most once: the ledger is checked before any
//! provider call and the insert itself is keyed on the provider payment id.
//! Payments whose external reference names a lead are handed to
//! [`ProvisionTenantHandler`].

use std::sync::Arc;

use crate::domain::billing::{
    ExternalReference, LedgerEntry, LedgerStatus, ReferenceTarget, TenantOwner, WebhookError,
};
use crate::domain::foundation::{TenantId, TenantOwnerId, Timestamp};
use crate::ports::{LedgerRepository, PaymentProvider, ProviderPayment, SaveResult, TenantRepository};

use super::credential_resolver::CredentialResolver;
use super::provision_tenant::{ProvisionTenantHandler, ProvisioningOutcome};

/// Command to process one payment notification.
#[derive(Debug, Clone)]
pub struct ProcessPaymentCommand {
    pub payment_id: String,
    /// Owner to probe first, from the notification URL.
    pub owner_hint: Option<TenantOwnerId>,
}

/// Result of processing a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// New ledger entry written for a tenant.
    Recorded {
        tenant_id: TenantId,
        status: LedgerStatus,
    },
    /// The payment is already in the ledger.
    AlreadyRecorded,
    /// No enabled owner can read the payment.
    Unresolved,
    /// External reference missing or unparsable.
    UnknownReference,
    /// Referenced tenant does not exist.
    TenantNotFound,
    /// The reference names another owner than the one that resolved it.
    OwnerMismatch,
    /// Payment belongs to a lead.
    Lead(ProvisioningOutcome),
}

impl PaymentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentOutcome::Recorded { .. } => "payment_recorded",
            PaymentOutcome::AlreadyRecorded => "already_recorded",
            PaymentOutcome::Unresolved => "owner_not_resolved",
            PaymentOutcome::UnknownReference => "unknown_reference",
            PaymentOutcome::TenantNotFound => "tenant_not_found",
            PaymentOutcome::OwnerMismatch => "owner_mismatch",
            PaymentOutcome::Lead(outcome) => outcome.label(),
        }
    }
}

pub struct ProcessPaymentHandler {
    ledger: Arc<dyn LedgerRepository>,
    tenants: Arc<dyn TenantRepository>,
    provider: Arc<dyn PaymentProvider>,
    resolver: Arc<CredentialResolver>,
    provisioner: Arc<ProvisionTenantHandler>,
}

impl ProcessPaymentHandler {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        tenants: Arc<dyn TenantRepository>,
        provider: Arc<dyn PaymentProvider>,
        resolver: Arc<CredentialResolver>,
        provisioner: Arc<ProvisionTenantHandler>,
    ) -> Self {
        Self {
            ledger,
            tenants,
            provider,
            resolver,
            provisioner,
        }
    }

    pub async fn handle(&self, cmd: ProcessPaymentCommand) -> Result<PaymentOutcome, WebhookError> {
        let payment_id = cmd.payment_id.as_str();

        // 1. Idempotency: known payments cost no provider call
        if self.ledger.exists_for_payment(payment_id).await? {
            tracing::info!(payment_id, "Payment already recorded; ignoring");
            return Ok(PaymentOutcome::AlreadyRecorded);
        }

        // 2. Find the owner whose credential can read the payment
        let provider = &self.provider;
        let resolved = self
            .resolver
            .resolve("payment", payment_id, cmd.owner_hint.as_ref(), |credential| async move {
                provider.fetch_payment(&credential, payment_id).await
            })
            .await?;

        let Some(resolved) = resolved else {
            return Ok(PaymentOutcome::Unresolved);
        };

        // 3. Route on the external reference
        self.process_resolved(&resolved.owner, &resolved.resource).await
    }

    /// Handles a payment already fetched with `owner`'s credential.
    pub async fn process_resolved(
        &self,
        owner: &TenantOwner,
        payment: &ProviderPayment,
    ) -> Result<PaymentOutcome, WebhookError> {
        let reference = match payment
            .external_reference
            .as_deref()
            .map(str::parse::<ExternalReference>)
        {
            Some(Ok(reference)) => reference,
            Some(Err(err)) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    owner_id = %owner.id,
                    error = %err,
                    "Unparsable external reference; ignoring"
                );
                return Ok(PaymentOutcome::UnknownReference);
            }
            None => {
                tracing::warn!(
                    payment_id = %payment.id,
                    owner_id = %owner.id,
                    "Payment has no external reference; ignoring"
                );
                return Ok(PaymentOutcome::UnknownReference);
            }
        };

        if reference.conflicts_with_owner(&owner.id) {
            tracing::warn!(
                payment_id = %payment.id,
                owner_id = %owner.id,
                reference = %reference,
                "External reference names another owner; ignoring"
            );
            return Ok(PaymentOutcome::OwnerMismatch);
        }

        match reference.target {
            ReferenceTarget::Lead(lead_id) => {
                let outcome = self.provisioner.handle(owner, lead_id, payment).await?;
                Ok(PaymentOutcome::Lead(outcome))
            }
            ReferenceTarget::Tenant(tenant_id) => {
                self.record_tenant_payment(owner, tenant_id, payment).await
            }
        }
    }

    async fn record_tenant_payment(
        &self,
        owner: &TenantOwner,
        tenant_id: TenantId,
        payment: &ProviderPayment,
    ) -> Result<PaymentOutcome, WebhookError> {
        let Some(tenant) = self.tenants.find_by_id(&tenant_id).await? else {
            tracing::warn!(
                tenant_id = %tenant_id,
                payment_id = %payment.id,
                "Payment references unknown tenant; ignoring"
            );
            return Ok(PaymentOutcome::TenantNotFound);
        };

        if tenant.owner_id != owner.id {
            tracing::warn!(
                tenant_id = %tenant.id,
                owner_id = %owner.id,
                payment_id = %payment.id,
                "Tenant belongs to another owner; ignoring"
            );
            return Ok(PaymentOutcome::OwnerMismatch);
        }

        let now = Timestamp::now();
        let entry = LedgerEntry::from_payment(tenant.id, &payment.as_ledger_payment(), now);

        // Reactivate first: once the entry exists a redelivery stops at the
        // ledger check and would never get here again.
        if entry.status == LedgerStatus::Paid {
            self.tenants.mark_payment_approved(&tenant.id, now).await?;
        }

        match self.ledger.insert(&entry).await? {
            SaveResult::Inserted => {}
            SaveResult::AlreadyExists => {
                tracing::info!(
                    tenant_id = %tenant.id,
                    payment_id = %payment.id,
                    "Payment recorded concurrently; ignoring"
                );
                return Ok(PaymentOutcome::AlreadyRecorded);
            }
        }

        tracing::info!(
            tenant_id = %tenant.id,
            owner_id = %owner.id,
            payment_id = %payment.id,
            status = %entry.status,
            amount_cents = entry.amount_cents,
            "Payment recorded"
        );

        Ok(PaymentOutcome::Recorded {
            tenant_id: tenant.id,
            status: entry.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::adapters::memory::{InMemoryBillingStore, InMemoryIdentityService, StoreOperation};
    use crate::adapters::mercadopago::MockPaymentProvider;
    use crate::application::handlers::billing::ProvisioningSettings;
    use crate::domain::billing::{NewTenant, Plan, SubscriptionStatus, SubscriptionSync, Tenant};
    use crate::domain::foundation::{DomainError, PlanId};
    use crate::domain::provisioning::{Lead, ProvisioningStage};
    use crate::ports::PaymentError;

    /// Ledger where another delivery records the same payment between the
    /// existence check and the insert.
    struct RacingLedger {
        inner: Arc<InMemoryBillingStore>,
        raced: Mutex<bool>,
    }

    #[async_trait]
    impl LedgerRepository for RacingLedger {
        async fn exists_for_payment(&self, provider_payment_id: &str) -> Result<bool, DomainError> {
            LedgerRepository::exists_for_payment(&*self.inner, provider_payment_id).await
        }

        async fn insert(&self, entry: &LedgerEntry) -> Result<SaveResult, DomainError> {
            let mut raced = self.raced.lock().await;
            if !*raced {
                *raced = true;
                LedgerRepository::insert(&*self.inner, entry).await?;
            }
            LedgerRepository::insert(&*self.inner, entry).await
        }
    }

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        provider: MockPaymentProvider,
        handler: ProcessPaymentHandler,
        owner: TenantOwner,
        plan: Plan,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        let identity = Arc::new(InMemoryIdentityService::new());
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

        let provisioner = Arc::new(ProvisionTenantHandler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            identity,
            ProvisioningSettings::default(),
        ));
        let handler = ProcessPaymentHandler::new(
            store.clone(),
            store.clone(),
            Arc::new(provider.clone()),
            Arc::new(CredentialResolver::new(store.clone())),
            provisioner,
        );
        Fixture {
            store,
            provider,
            handler,
            owner,
            plan,
        }
    }

    impl Fixture {
        fn handler_with_ledger(&self, ledger: Arc<dyn LedgerRepository>) -> ProcessPaymentHandler {
            let provisioner = Arc::new(ProvisionTenantHandler::new(
                self.store.clone(),
                self.store.clone(),
                self.store.clone(),
                ledger.clone(),
                Arc::new(InMemoryIdentityService::new()),
                ProvisioningSettings::default(),
            ));
            ProcessPaymentHandler::new(
                ledger,
                self.store.clone(),
                Arc::new(self.provider.clone()),
                Arc::new(CredentialResolver::new(self.store.clone())),
                provisioner,
            )
        }

        async fn suspended_tenant(&self) -> Tenant {
            let mut tenant = Tenant::provision(
                NewTenant {
                    owner_id: self.owner.id,
                    name: "Acme",
                    slug: "acme".to_string(),
                    contact_email: "a@x.com",
                    contact_phone: None,
                    plan: &self.plan,
                },
                Timestamp::now(),
            );
            tenant.apply_subscription_sync(
                &SubscriptionSync::from_provider_state("paused"),
                Timestamp::now(),
            );
            self.store.add_tenant(tenant.clone()).await;
            tenant
        }
    }

    fn payment(id: &str, status: &str, reference: Option<String>) -> ProviderPayment {
        ProviderPayment {
            id: id.to_string(),
            status: status.to_string(),
            status_detail: None,
            external_reference: reference,
            transaction_amount: 99.9,
            payment_method_id: Some("credit_card".to_string()),
            payment_type_id: None,
            date_created: None,
            date_approved: None,
            payer_email: None,
        }
    }

    fn command(id: &str) -> ProcessPaymentCommand {
        ProcessPaymentCommand {
            payment_id: id.to_string(),
            owner_hint: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Tenant Payments
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approved_payment_records_entry_and_reactivates_tenant() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(tenant.id.to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(
            outcome,
            PaymentOutcome::Recorded {
                tenant_id: tenant.id,
                status: LedgerStatus::Paid
            }
        );
        let entries = f.store.ledger_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount_cents, 9990);
        let stored = f.store.tenant(&tenant.id).await.unwrap();
        assert_eq!(stored.subscription_status, SubscriptionStatus::Active);
        assert!(stored.is_active);
        assert_eq!(stored.provider_subscription_state.as_deref(), Some("paused"));
    }

    #[tokio::test]
    async fn rejected_payment_is_recorded_without_touching_tenant() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "rejected", Some(tenant.id.to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(
            outcome,
            PaymentOutcome::Recorded {
                tenant_id: tenant.id,
                status: LedgerStatus::Cancelled
            }
        );
        let stored = f.store.tenant(&tenant.id).await.unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn duplicate_delivery_makes_no_provider_call() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(tenant.id.to_string())),
        );
        f.handler.handle(command("p-1")).await.unwrap();
        f.provider.clear_calls();

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::AlreadyRecorded);
        assert_eq!(f.provider.total_calls(), 0);
        assert_eq!(f.store.ledger_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn reactivation_failure_is_retried_on_redelivery() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(tenant.id.to_string())),
        );
        f.store.fail_on(StoreOperation::MarkPaymentApproved).await;

        let err = f.handler.handle(command("p-1")).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(f.store.ledger_entries().await.is_empty());
        assert!(!f.store.tenant(&tenant.id).await.unwrap().is_active);

        f.store.recover(StoreOperation::MarkPaymentApproved).await;
        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert!(matches!(outcome, PaymentOutcome::Recorded { .. }));
        assert_eq!(f.store.ledger_entries().await.len(), 1);
        let stored = f.store.tenant(&tenant.id).await.unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.subscription_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn entry_recorded_concurrently_is_already_recorded() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(tenant.id.to_string())),
        );
        let handler = f.handler_with_ledger(Arc::new(RacingLedger {
            inner: f.store.clone(),
            raced: Mutex::new(false),
        }));

        let outcome = handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::AlreadyRecorded);
        assert_eq!(f.store.ledger_entries().await.len(), 1);
        assert!(f.store.tenant(&tenant.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn owner_prefixed_reference_is_accepted() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        let reference = ExternalReference::tenant(tenant.id).with_owner(f.owner.id);
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(reference.to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert!(matches!(outcome, PaymentOutcome::Recorded { .. }));
    }

    // ══════════════════════════════════════════════════════════════
    // Ignored Payments
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn reference_for_another_owner_is_skipped() {
        let f = fixture().await;
        let tenant = f.suspended_tenant().await;
        let reference = ExternalReference::tenant(tenant.id).with_owner(TenantOwnerId::new());
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(reference.to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::OwnerMismatch);
        assert!(f.store.ledger_entries().await.is_empty());
    }

    #[tokio::test]
    async fn missing_reference_is_ignored() {
        let f = fixture().await;
        f.provider
            .add_payment("token-a", payment("p-1", "approved", None));

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::UnknownReference);
    }

    #[tokio::test]
    async fn garbage_reference_is_ignored() {
        let f = fixture().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some("order-77".to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::UnknownReference);
        assert!(f.store.ledger_entries().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_tenant_is_ignored() {
        let f = fixture().await;
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(TenantId::new().to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::TenantNotFound);
    }

    #[tokio::test]
    async fn payment_no_owner_can_read_is_unresolved() {
        let f = fixture().await;

        let outcome = f.handler.handle(command("p-404")).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::Unresolved);
        assert_eq!(f.provider.total_calls(), 1);
    }

    #[tokio::test]
    async fn transient_provider_failure_requests_redelivery() {
        let f = fixture().await;
        f.provider
            .set_owner_error("token-a", PaymentError::network("reset"));

        let err = f.handler.handle(command("p-1")).await.unwrap_err();

        assert!(err.is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // Lead Payments
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn lead_reference_is_provisioned() {
        let f = fixture().await;
        let lead = Lead::new(f.owner.id, f.plan.id, "Acme", "Ana", "a@x.com", None);
        f.store.add_lead(lead.clone()).await;
        let reference = ExternalReference::lead(lead.id).with_owner(f.owner.id);
        f.provider.add_payment(
            "token-a",
            payment("p-1", "approved", Some(reference.to_string())),
        );

        let outcome = f.handler.handle(command("p-1")).await.unwrap();

        assert_eq!(outcome.label(), "tenant_provisioned");
        let stored = f.store.lead(&lead.id).await.unwrap();
        assert_eq!(stored.provisioning_stage, ProvisioningStage::Done);

        let again = f.handler.handle(command("p-1")).await.unwrap();
        assert_eq!(again, PaymentOutcome::AlreadyRecorded);
    }
}
