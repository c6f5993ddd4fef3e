//! Tenant repository port.
//!
//! # Constraints
//!
//! Implementations must enforce, at the storage layer:
//! - `slug` unique across all tenants (`ErrorCode::SlugTaken`)
//! - `(owner_id, contact_email)` unique (`ErrorCode::Conflict`)
//!
//! The handlers rely on these to close the check-then-insert race between
//! concurrent deliveries of the same event.

use async_trait::async_trait;

use crate::domain::billing::{SubscriptionSync, Tenant};
use crate::domain::foundation::{DomainError, TenantId, TenantOwnerId, Timestamp};

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    async fn find_by_provider_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Tenant>, DomainError>;

    /// Email is compared in its normalized (trimmed, lower-case) form.
    async fn find_by_owner_and_email(
        &self,
        owner_id: &TenantOwnerId,
        email: &str,
    ) -> Result<Option<Tenant>, DomainError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, DomainError>;

    /// Insert a new tenant.
    ///
    /// # Errors
    ///
    /// - `SlugTaken` if the slug is already in use
    /// - `Conflict` if the owner already has a tenant with this contact email
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError>;

    /// Write the reconciler-owned subscription fields.
    async fn apply_subscription_sync(
        &self,
        id: &TenantId,
        sync: &SubscriptionSync,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Mark the tenant active after a paid ledger entry. Leaves the
    /// provider-state mirror untouched.
    async fn mark_payment_approved(&self, id: &TenantId, now: Timestamp)
        -> Result<(), DomainError>;
}
