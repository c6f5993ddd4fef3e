//! Append-only audit trail for lead payment and provisioning events.
//!
//! Entries are structured and never carry secrets; the human-readable
//! `Lead::notes` field is the only place a temporary credential is surfaced.

use std::fmt;

use crate::domain::foundation::{LeadId, Timestamp};

/// What happened to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditKind {
    PaymentStatusUpdated,
    Converted,
    DuplicateTenantSkipped,
    TenantCreated,
    ConfigSeeded,
    ScheduleSeeded,
    AccountCreated,
    AccountReused,
    OwnerBound,
    StepFailed,
    ProvisioningCompleted,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::PaymentStatusUpdated => "payment_status_updated",
            AuditKind::Converted => "converted",
            AuditKind::DuplicateTenantSkipped => "duplicate_tenant_skipped",
            AuditKind::TenantCreated => "tenant_created",
            AuditKind::ConfigSeeded => "config_seeded",
            AuditKind::ScheduleSeeded => "schedule_seeded",
            AuditKind::AccountCreated => "account_created",
            AuditKind::AccountReused => "account_reused",
            AuditKind::OwnerBound => "owner_bound",
            AuditKind::StepFailed => "step_failed",
            AuditKind::ProvisioningCompleted => "provisioning_completed",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadAuditEntry {
    pub lead_id: LeadId,
    pub kind: AuditKind,
    pub detail: String,
    pub at: Timestamp,
}

impl LeadAuditEntry {
    pub fn new(lead_id: LeadId, kind: AuditKind, detail: impl Into<String>, at: Timestamp) -> Self {
        Self {
            lead_id,
            kind,
            detail: detail.into(),
            at,
        }
    }
}
