//! In-memory billing store.
//!
//! Implements every storage port over one shared state so that handlers and
//! integration tests run without a database. Uniqueness rules match the
//! Postgres schema: ledger `provider_payment_id`, tenant `slug`, tenant
//! `(owner_id, contact_email)`, binding `(account_id, tenant_id)` and schedule
//! `(tenant_id, weekday)`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{LedgerEntry, Plan, SubscriptionSync, Tenant, TenantOwner};
use crate::domain::foundation::{
    DomainError, ErrorCode, LeadId, PlanId, TenantId, TenantOwnerId, Timestamp,
};
use crate::domain::provisioning::{
    DefaultScheduleEntry, Lead, LeadAuditEntry, OwnerBinding, TenantConfig,
};
use crate::ports::{
    LeadRepository, LedgerRepository, SaveResult, TenantOwnerRepository, TenantRepository,
    TenantSetupRepository,
};

/// Store operations that can be made to fail, for partial-failure tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    InsertTenant,
    MarkPaymentApproved,
    InsertLedgerEntry,
    UpdateLead,
    SaveConfig,
    SaveSchedule,
    BindOwner,
}

#[derive(Default)]
struct StoreState {
    owners: HashMap<TenantOwnerId, TenantOwner>,
    plans: HashMap<PlanId, Plan>,
    tenants: HashMap<TenantId, Tenant>,
    ledger: Vec<LedgerEntry>,
    leads: HashMap<LeadId, Lead>,
    audit: Vec<LeadAuditEntry>,
    configs: HashMap<TenantId, TenantConfig>,
    schedule: Vec<DefaultScheduleEntry>,
    bindings: Vec<OwnerBinding>,
    failing: HashSet<StoreOperation>,
    writes: usize,
}

impl StoreState {
    fn check(&self, operation: StoreOperation) -> Result<(), DomainError> {
        if self.failing.contains(&operation) {
            return Err(DomainError::database(format!(
                "injected failure: {:?}",
                operation
            )));
        }
        Ok(())
    }
}

/// In-memory implementation of the billing storage ports.
#[derive(Default)]
pub struct InMemoryBillingStore {
    state: RwLock<StoreState>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Seeding
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn add_owner(&self, owner: TenantOwner) {
        self.state.write().await.owners.insert(owner.id, owner);
    }

    pub async fn add_plan(&self, plan: Plan) {
        self.state.write().await.plans.insert(plan.id, plan);
    }

    pub async fn add_lead(&self, lead: Lead) {
        self.state.write().await.leads.insert(lead.id, lead);
    }

    pub async fn add_tenant(&self, tenant: Tenant) {
        self.state.write().await.tenants.insert(tenant.id, tenant);
    }

    /// Make an operation fail with a database error until [`recover`](Self::recover).
    pub async fn fail_on(&self, operation: StoreOperation) {
        self.state.write().await.failing.insert(operation);
    }

    pub async fn recover(&self, operation: StoreOperation) {
        self.state.write().await.failing.remove(&operation);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn tenants(&self) -> Vec<Tenant> {
        self.state.read().await.tenants.values().cloned().collect()
    }

    pub async fn tenant(&self, id: &TenantId) -> Option<Tenant> {
        self.state.read().await.tenants.get(id).cloned()
    }

    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.ledger.clone()
    }

    pub async fn lead(&self, id: &LeadId) -> Option<Lead> {
        self.state.read().await.leads.get(id).cloned()
    }

    pub async fn audit_entries(&self, lead_id: &LeadId) -> Vec<LeadAuditEntry> {
        self.state
            .read()
            .await
            .audit
            .iter()
            .filter(|e| &e.lead_id == lead_id)
            .cloned()
            .collect()
    }

    pub async fn config(&self, tenant_id: &TenantId) -> Option<TenantConfig> {
        self.state.read().await.configs.get(tenant_id).cloned()
    }

    pub async fn schedule(&self, tenant_id: &TenantId) -> Vec<DefaultScheduleEntry> {
        self.state
            .read()
            .await
            .schedule
            .iter()
            .filter(|e| &e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub async fn bindings(&self) -> Vec<OwnerBinding> {
        self.state.read().await.bindings.clone()
    }

    /// Number of successful mutating calls, seeding excluded.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }
}

#[async_trait]
impl TenantOwnerRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &TenantOwnerId) -> Result<Option<TenantOwner>, DomainError> {
        Ok(self.state.read().await.owners.get(id).cloned())
    }

    async fn list_billing_enabled(&self) -> Result<Vec<TenantOwner>, DomainError> {
        let mut owners: Vec<TenantOwner> = self
            .state
            .read()
            .await
            .owners
            .values()
            .filter(|o| o.billing_enabled)
            .cloned()
            .collect();
        owners.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(owners)
    }
}

#[async_trait]
impl TenantRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state.read().await.tenants.get(id).cloned())
    }

    async fn find_by_provider_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .tenants
            .values()
            .find(|t| t.provider_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn find_by_owner_and_email(
        &self,
        owner_id: &TenantOwnerId,
        email: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .tenants
            .values()
            .find(|t| &t.owner_id == owner_id && t.contact_email.to_lowercase() == email)
            .cloned())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .tenants
            .values()
            .any(|t| t.slug == slug))
    }

    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::InsertTenant)?;

        if state.tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(DomainError::new(
                ErrorCode::SlugTaken,
                format!("slug '{}' already in use", tenant.slug),
            ));
        }
        let email = tenant.contact_email.to_lowercase();
        if state
            .tenants
            .values()
            .any(|t| t.owner_id == tenant.owner_id && t.contact_email.to_lowercase() == email)
        {
            return Err(DomainError::conflict("owner already has a tenant for this email"));
        }

        state.tenants.insert(tenant.id, tenant.clone());
        state.writes += 1;
        Ok(())
    }

    async fn apply_subscription_sync(
        &self,
        id: &TenantId,
        sync: &SubscriptionSync,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let tenant = state
            .tenants
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::NotFound, "tenant not found"))?;
        tenant.apply_subscription_sync(sync, now);
        state.writes += 1;
        Ok(())
    }

    async fn mark_payment_approved(
        &self,
        id: &TenantId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::MarkPaymentApproved)?;
        let tenant = state
            .tenants
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::NotFound, "tenant not found"))?;
        tenant.apply_approved_payment(now);
        state.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for InMemoryBillingStore {
    async fn exists_for_payment(&self, provider_payment_id: &str) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .ledger
            .iter()
            .any(|e| e.provider_payment_id == provider_payment_id))
    }

    async fn insert(&self, entry: &LedgerEntry) -> Result<SaveResult, DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::InsertLedgerEntry)?;

        if state
            .ledger
            .iter()
            .any(|e| e.provider_payment_id == entry.provider_payment_id)
        {
            return Ok(SaveResult::AlreadyExists);
        }
        state.ledger.push(entry.clone());
        state.writes += 1;
        Ok(SaveResult::Inserted)
    }
}

#[async_trait]
impl LeadRepository for InMemoryBillingStore {
    async fn find_with_plan(&self, id: &LeadId) -> Result<Option<(Lead, Plan)>, DomainError> {
        let state = self.state.read().await;
        let Some(lead) = state.leads.get(id) else {
            return Ok(None);
        };
        let plan = state.plans.get(&lead.plan_id).cloned().ok_or_else(|| {
            DomainError::new(ErrorCode::NotFound, "plan not found")
                .with_detail("plan_id", lead.plan_id.to_string())
        })?;
        Ok(Some((lead.clone(), plan)))
    }

    async fn update(&self, lead: &Lead) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::UpdateLead)?;

        let stored = state
            .leads
            .get_mut(&lead.id)
            .ok_or_else(|| DomainError::new(ErrorCode::NotFound, "lead not found"))?;
        let notes = std::mem::take(&mut stored.notes);
        *stored = Lead {
            notes,
            ..lead.clone()
        };
        state.writes += 1;
        Ok(())
    }

    async fn append_note(&self, id: &LeadId, note: &str) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let stored = state
            .leads
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::NotFound, "lead not found"))?;
        stored.add_note(note);
        state.writes += 1;
        Ok(())
    }

    async fn append_audit(&self, entry: &LeadAuditEntry) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.audit.push(entry.clone());
        state.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl TenantSetupRepository for InMemoryBillingStore {
    async fn save_config(&self, config: &TenantConfig) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::SaveConfig)?;
        state.configs.insert(config.tenant_id, config.clone());
        state.writes += 1;
        Ok(())
    }

    async fn save_schedule(&self, entries: &[DefaultScheduleEntry]) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::SaveSchedule)?;
        for entry in entries {
            match state
                .schedule
                .iter_mut()
                .find(|e| e.tenant_id == entry.tenant_id && e.weekday == entry.weekday)
            {
                Some(existing) => *existing = entry.clone(),
                None => state.schedule.push(entry.clone()),
            }
        }
        state.writes += 1;
        Ok(())
    }

    async fn bind_owner(&self, binding: &OwnerBinding) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(StoreOperation::BindOwner)?;
        match state
            .bindings
            .iter_mut()
            .find(|b| b.account_id == binding.account_id && b.tenant_id == binding.tenant_id)
        {
            Some(existing) => *existing = *binding,
            None => state.bindings.push(*binding),
        }
        state.writes += 1;
        Ok(())
    }
}
