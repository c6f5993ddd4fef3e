//! tenant-billing - billing reconciliation for a multi-tenant restaurant platform
//!
//! Receives payment-provider notifications, keeps tenant subscription status in
//! sync with the provider, records payments in an idempotent ledger and turns
//! paid leads into fully provisioned tenants.
//!
//! Layout follows ports and adapters:
//! - `domain` - billing and provisioning types with their invariants
//! - `ports` - storage, provider and identity interfaces
//! - `application` - webhook dispatch and the billing handlers
//! - `adapters` - PostgreSQL, Mercado Pago, identity API, HTTP and in-memory implementations
//! - `config` - environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
