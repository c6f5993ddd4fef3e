//! In-memory adapters for the storage and identity ports.
//!
//! Used by the test suites and for running the service without a database.

mod billing_store;
mod identity;

pub use billing_store::{InMemoryBillingStore, StoreOperation};
pub use identity::InMemoryIdentityService;
