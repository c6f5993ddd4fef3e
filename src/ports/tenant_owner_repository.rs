//! Tenant owner (reseller) repository port.

use async_trait::async_trait;

use crate::domain::billing::TenantOwner;
use crate::domain::foundation::{DomainError, TenantOwnerId};

/// Read access to tenant owners and their provider credentials.
#[async_trait]
pub trait TenantOwnerRepository: Send + Sync {
    /// Find an owner by id.
    async fn find_by_id(&self, id: &TenantOwnerId) -> Result<Option<TenantOwner>, DomainError>;

    /// All owners with billing integration enabled, ordered by creation time
    /// then id so credential probing is deterministic.
    async fn list_billing_enabled(&self) -> Result<Vec<TenantOwner>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_owner_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn TenantOwnerRepository) {}
    }
}
