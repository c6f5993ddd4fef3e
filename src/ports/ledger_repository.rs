//! Ledger repository port - idempotent payment recording.
//!
//! The provider delivers at least once, so the same payment can arrive many
//! times, possibly concurrently. `provider_payment_id` is the idempotency key
//! and must be backed by a unique constraint.

use async_trait::async_trait;

use crate::domain::billing::LedgerEntry;
use crate::domain::foundation::DomainError;

/// Result of attempting to save a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Entry was inserted (first time seeing this payment).
    Inserted,
    /// Entry already exists (duplicate delivery).
    AlreadyExists,
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Check whether an entry exists for a provider payment id.
    async fn exists_for_payment(&self, provider_payment_id: &str) -> Result<bool, DomainError>;

    /// Insert an entry.
    ///
    /// Returns `SaveResult::AlreadyExists` when another delivery inserted the
    /// same provider payment id first.
    async fn insert(&self, entry: &LedgerEntry) -> Result<SaveResult, DomainError>;
}
