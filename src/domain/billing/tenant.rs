//! Tenant (restaurant) entity, its subscription status and plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{LeadId, PlanId, TenantId, TenantOwnerId, Timestamp, ValidationError};

use super::status_mapping::map_subscription_state;

/// Length of the first subscription window when a plan has no trial period.
const DEFAULT_FIRST_WINDOW_DAYS: i64 = 30;

/// Internal subscription status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
}

impl SubscriptionStatus {
    /// Active and trial tenants can operate; suspended and cancelled cannot.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "suspended" => Ok(SubscriptionStatus::Suspended),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

/// Subscription plan a lead asks for at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub monthly_fee_cents: i64,
    pub setup_fee_cents: Option<i64>,
    pub trial_days: u32,
}

/// Tenant fields written by the subscription reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSync {
    pub status: SubscriptionStatus,
    pub is_active: bool,
    /// Raw provider state, stored as a mirror.
    pub provider_state: String,
}

impl SubscriptionSync {
    /// Derives the tenant update for an authoritative provider subscription state.
    pub fn from_provider_state(provider_state: &str) -> Self {
        let status = map_subscription_state(provider_state);
        Self {
            status,
            is_active: status.grants_access(),
            provider_state: provider_state.to_string(),
        }
    }
}

/// A restaurant account; the unit of billing and access control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: TenantId,
    pub owner_id: TenantOwnerId,
    pub name: String,
    /// Globally unique, URL-safe identifier.
    pub slug: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub is_active: bool,
    pub provider_subscription_id: Option<String>,
    pub provider_subscription_state: Option<String>,
    pub monthly_fee_cents: i64,
    pub setup_fee_cents: Option<i64>,
    pub trial_days: u32,
    pub subscription_started_at: Timestamp,
    pub subscription_ends_at: Timestamp,
    /// Lead whose payment created this tenant.
    pub source_lead_id: Option<LeadId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a tenant from a converted lead.
#[derive(Debug, Clone)]
pub struct NewTenant<'a> {
    pub owner_id: TenantOwnerId,
    pub name: &'a str,
    pub slug: String,
    pub contact_email: &'a str,
    pub contact_phone: Option<&'a str>,
    pub plan: &'a Plan,
}

impl Tenant {
    /// Creates an already-paid tenant: active, with its first subscription window open.
    pub fn provision(new: NewTenant<'_>, now: Timestamp) -> Self {
        let window_days = match new.plan.trial_days {
            0 => DEFAULT_FIRST_WINDOW_DAYS,
            days => i64::from(days),
        };

        Self {
            id: TenantId::new(),
            owner_id: new.owner_id,
            name: new.name.to_string(),
            slug: new.slug,
            contact_email: new.contact_email.to_string(),
            contact_phone: new.contact_phone.map(str::to_string),
            subscription_status: SubscriptionStatus::Active,
            is_active: true,
            provider_subscription_id: None,
            provider_subscription_state: None,
            monthly_fee_cents: new.plan.monthly_fee_cents,
            setup_fee_cents: new.plan.setup_fee_cents,
            trial_days: new.plan.trial_days,
            subscription_started_at: now,
            subscription_ends_at: now.add_days(window_days),
            source_lead_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the tenant as created by `lead_id`, so a retried conversion of
    /// the same lead can recognise it.
    pub fn for_lead(mut self, lead_id: LeadId) -> Self {
        self.source_lead_id = Some(lead_id);
        self
    }

    /// True when this tenant was created by converting `lead_id`.
    pub fn was_created_by(&self, lead_id: &LeadId) -> bool {
        self.source_lead_id.as_ref() == Some(lead_id)
    }

    /// Applies an authoritative subscription state from the provider.
    pub fn apply_subscription_sync(&mut self, sync: &SubscriptionSync, now: Timestamp) {
        self.subscription_status = sync.status;
        self.is_active = sync.is_active;
        self.provider_subscription_state = Some(sync.provider_state.clone());
        self.updated_at = now;
    }

    /// Opens (or keeps open) access after an approved payment.
    ///
    /// The provider-state mirror is left untouched; the next subscription
    /// event reconciles any divergence.
    pub fn apply_approved_payment(&mut self, now: Timestamp) {
        self.subscription_status = SubscriptionStatus::Active;
        self.is_active = true;
        self.updated_at = now;
    }
}
