//! Lead aggregate: a prospective tenant captured at checkout.

use std::fmt;
use std::str::FromStr;

use crate::domain::billing::{map_payment_state, LedgerStatus};
use crate::domain::foundation::{
    DomainError, LeadId, PlanId, StateMachine, TenantId, TenantOwnerId, Timestamp, ValidationError,
};

use super::ProvisioningStage;

/// Lead lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    Pending,
    /// Paid; terminal with respect to auto-provisioning.
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }
}

impl StateMachine for LeadStatus {
    fn successors(&self) -> &'static [Self] {
        match self {
            LeadStatus::Pending => &[LeadStatus::Converted, LeadStatus::Lost],
            LeadStatus::Lost => &[LeadStatus::Converted],
            LeadStatus::Converted => &[],
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LeadStatus::Pending),
            "converted" => Ok(LeadStatus::Converted),
            "lost" => Ok(LeadStatus::Lost),
            other => Err(ValidationError::invalid_format(
                "lead_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// A prospective tenant.
///
/// Created by the checkout flow; this crate only records payment outcomes on it
/// and drives its provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub id: LeadId,
    pub owner_id: TenantOwnerId,
    pub plan_id: PlanId,
    pub business_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: LeadStatus,
    pub provider_payment_id: Option<String>,
    pub provider_payment_status: Option<String>,
    /// Tenant created for this lead, once provisioning got that far.
    pub tenant_id: Option<TenantId>,
    pub provisioning_stage: ProvisioningStage,
    /// Set once provisioning created the owner account rather than reusing one.
    pub owner_account_created: bool,
    /// Human-readable annotations for operators.
    pub notes: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Lead {
    pub fn new(
        owner_id: TenantOwnerId,
        plan_id: PlanId,
        business_name: impl Into<String>,
        contact_name: impl Into<String>,
        email: impl Into<String>,
        phone: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: LeadId::new(),
            owner_id,
            plan_id,
            business_name: business_name.into(),
            contact_name: contact_name.into(),
            email: email.into(),
            phone,
            status: LeadStatus::Pending,
            provider_payment_id: None,
            provider_payment_status: None,
            tenant_id: None,
            provisioning_stage: ProvisioningStage::Pending,
            owner_account_created: false,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Email used as the tenant contact and account login.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// True when there is nothing left to do for this lead.
    pub fn is_fully_provisioned(&self) -> bool {
        self.status == LeadStatus::Converted && self.provisioning_stage == ProvisioningStage::Done
    }

    /// Mirrors a provider payment onto the lead and converts it when paid.
    ///
    /// Returns the mapped ledger status. A converted lead is immutable, so its
    /// mirror fields are left alone.
    pub fn record_payment(
        &mut self,
        payment_id: &str,
        provider_status: &str,
        now: Timestamp,
    ) -> Result<LedgerStatus, DomainError> {
        let status = map_payment_state(provider_status);
        if self.status == LeadStatus::Converted {
            return Ok(status);
        }

        self.provider_payment_id = Some(payment_id.to_string());
        self.provider_payment_status = Some(provider_status.to_string());
        if status == LedgerStatus::Paid {
            self.status = self.status.transition_to(LeadStatus::Converted)?;
        }
        self.updated_at = now;
        Ok(status)
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}
