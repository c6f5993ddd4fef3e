//! Billing handlers.
//!
//! - `DispatchWebhookHandler` - parses and routes provider notifications
//! - `ReconcileSubscriptionHandler` - subscription status sync
//! - `ProcessPaymentHandler` - idempotent payment ledger
//! - `ProcessMerchantOrderHandler` - one-off checkout orders
//! - `ProvisionTenantHandler` - lead to tenant provisioning
//! - `CredentialResolver` - finds the owner whose credential reads a resource

mod credential_resolver;
mod dispatch_webhook;
mod process_merchant_order;
mod process_payment;
mod provision_tenant;
mod reconcile_subscription;

use std::sync::Arc;

use crate::ports::{
    IdentityService, LeadRepository, LedgerRepository, PaymentProvider, TenantOwnerRepository,
    TenantRepository, TenantSetupRepository,
};

pub use credential_resolver::{CredentialResolver, ResolvedResource};
pub use dispatch_webhook::{DispatchWebhookHandler, WebhookCommand, WebhookOutcome};
pub use process_merchant_order::{
    MerchantOrderOutcome, ProcessMerchantOrderCommand, ProcessMerchantOrderHandler,
};
pub use process_payment::{PaymentOutcome, ProcessPaymentCommand, ProcessPaymentHandler};
pub use provision_tenant::{ProvisionTenantHandler, ProvisioningOutcome, ProvisioningSettings};
pub use reconcile_subscription::{ReconcileSubscriptionHandler, SubscriptionOutcome};

/// Ports the billing handlers depend on.
#[derive(Clone)]
pub struct BillingPorts {
    pub owners: Arc<dyn TenantOwnerRepository>,
    pub tenants: Arc<dyn TenantRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub setup: Arc<dyn TenantSetupRepository>,
    pub provider: Arc<dyn PaymentProvider>,
    pub identity: Arc<dyn IdentityService>,
}

impl DispatchWebhookHandler {
    /// Wires every billing handler over one set of ports.
    pub fn from_ports(ports: BillingPorts, settings: ProvisioningSettings) -> Self {
        let resolver = Arc::new(CredentialResolver::new(ports.owners.clone()));

        let provisioner = Arc::new(ProvisionTenantHandler::new(
            ports.leads,
            ports.tenants.clone(),
            ports.setup,
            ports.ledger.clone(),
            ports.identity,
            settings,
        ));
        let payments = Arc::new(ProcessPaymentHandler::new(
            ports.ledger.clone(),
            ports.tenants.clone(),
            ports.provider.clone(),
            resolver.clone(),
            provisioner,
        ));
        let merchant_orders = Arc::new(ProcessMerchantOrderHandler::new(
            ports.ledger,
            ports.provider.clone(),
            resolver,
            payments.clone(),
        ));
        let subscriptions = Arc::new(ReconcileSubscriptionHandler::new(
            ports.tenants,
            ports.owners,
            ports.provider,
        ));

        Self::new(subscriptions, payments, merchant_orders)
    }
}
