//! Domain layer containing business rules and types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machines)
//! - `billing` - Tenants, owners, the payment ledger and webhook envelopes
//! - `provisioning` - Leads and the records seeded when one converts

pub mod billing;
pub mod foundation;
pub mod provisioning;
