//! Billing domain: tenants, owners, the payment ledger and webhook handling.

mod external_reference;
mod ledger;
mod status_mapping;
mod tenant;
mod tenant_owner;
mod webhook;
mod webhook_errors;
mod webhook_signature;

pub use external_reference::{looks_like_lead_reference, ExternalReference, ReferenceTarget};
pub use ledger::{amount_to_cents, LedgerEntry, LedgerPayment, LedgerStatus};
pub use status_mapping::{map_payment_state, map_subscription_state};
pub use tenant::{NewTenant, Plan, SubscriptionStatus, SubscriptionSync, Tenant};
pub use tenant_owner::{ProviderCredential, TenantOwner};
pub use webhook::{BillingEvent, BillingEventKind, MalformedEnvelope, WebhookEnvelope};
pub use webhook_errors::WebhookError;
pub use webhook_signature::{hex_encode, manifest, SignatureHeader, WebhookSignatureVerifier};
