//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! ## Provider Port
//!
//! - `PaymentProvider` - Read-only access to subscriptions, payments and
//!   merchant orders, per owner credential
//!
//! ## Storage Ports
//!
//! - `TenantOwnerRepository` - Owners and their credentials
//! - `TenantRepository` - Tenants and their subscription state
//! - `LedgerRepository` - Idempotent payment ledger
//! - `LeadRepository` - Leads, notes and audit log
//! - `TenantSetupRepository` - Config, schedule and owner bindings
//!
//! ## Identity Port
//!
//! - `IdentityService` - Account lookup and creation

mod identity_service;
mod lead_repository;
mod ledger_repository;
mod payment_provider;
mod tenant_owner_repository;
mod tenant_repository;
mod tenant_setup_repository;

pub use identity_service::{Account, IdentityService};
pub use lead_repository::LeadRepository;
pub use ledger_repository::{LedgerRepository, SaveResult};
pub use payment_provider::{
    MerchantOrderPayment, PaymentError, PaymentErrorCode, PaymentProvider, ProviderMerchantOrder,
    ProviderPayment, ProviderSubscription,
};
pub use tenant_owner_repository::TenantOwnerRepository;
pub use tenant_repository::TenantRepository;
pub use tenant_setup_repository::TenantSetupRepository;
