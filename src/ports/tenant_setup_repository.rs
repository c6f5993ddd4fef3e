//! Port for the records seeded alongside a new tenant.
//!
//! Every write is an upsert so a resumed provisioning run can repeat it.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::provisioning::{DefaultScheduleEntry, OwnerBinding, TenantConfig};

#[async_trait]
pub trait TenantSetupRepository: Send + Sync {
    /// Upsert the tenant's configuration (one per tenant).
    async fn save_config(&self, config: &TenantConfig) -> Result<(), DomainError>;

    /// Upsert schedule rows keyed by `(tenant_id, weekday)`.
    async fn save_schedule(&self, entries: &[DefaultScheduleEntry]) -> Result<(), DomainError>;

    /// Upsert an account-to-tenant binding keyed by `(account_id, tenant_id)`.
    async fn bind_owner(&self, binding: &OwnerBinding) -> Result<(), DomainError>;
}
