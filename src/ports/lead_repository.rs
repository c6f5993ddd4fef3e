//! Lead repository port.

use async_trait::async_trait;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, LeadId};
use crate::domain::provisioning::{Lead, LeadAuditEntry};

#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Load a lead together with the plan it asked for.
    async fn find_with_plan(&self, id: &LeadId) -> Result<Option<(Lead, Plan)>, DomainError>;

    /// Persist status, payment mirror fields, tenant id and provisioning stage.
    ///
    /// Notes are append-only and written through [`append_note`](Self::append_note).
    async fn update(&self, lead: &Lead) -> Result<(), DomainError>;

    /// Append a human-readable annotation.
    async fn append_note(&self, id: &LeadId, note: &str) -> Result<(), DomainError>;

    /// Append a structured audit entry.
    async fn append_audit(&self, entry: &LeadAuditEntry) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn LeadRepository) {}
    }
}
