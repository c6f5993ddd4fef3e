//! ProvisionTenantHandler - turns a paid lead into a working tenant.
//!
//! Provisioning runs as a sequence of steps whose progress is stored on the
//! lead as a [`ProvisioningStage`]:
//!
//! 1. create the tenant (unique slug, plan pricing copied)
//! 2. seed tenant config and the default weekly schedule
//! 3. find or create the owner's identity account
//! 4. bind the account to the tenant as owner
//! 5. record the paid ledger entry and close out the lead
//!
//! A failed step is audited and noted on the lead; independent later steps
//! still run. The stored stage only advances across an unbroken run of
//! successes, so a redelivered payment resumes at the first step that has
//! not completed. The run returns an error while the stage is short of
//! `Done`, which makes the provider redeliver.

use std::sync::Arc;

use crate::domain::billing::{
    LedgerEntry, LedgerStatus, NewTenant, Plan, Tenant, TenantOwner, WebhookError,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, LeadId, StateMachine, TenantId, Timestamp,
};
use crate::domain::provisioning::{
    default_week, slug_candidate, slugify, AuditKind, Lead, LeadAuditEntry, LeadStatus,
    OwnerBinding, ProvisioningStage, ScheduleDefaults, TemporaryCredential, TenantConfig,
};
use crate::ports::{
    Account, IdentityService, LeadRepository, LedgerRepository, ProviderPayment, SaveResult,
    TenantRepository, TenantSetupRepository,
};

/// Candidate slugs checked before an insert is attempted.
const MAX_SLUG_PROBES: u32 = 50;

/// Inserts retried after losing a slug race.
const MAX_INSERT_ATTEMPTS: u32 = 5;

/// Values seeded into new tenants.
#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    pub schedule: ScheduleDefaults,
    /// Prefix used when amounts are written into lead notes.
    pub currency_label: String,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            schedule: ScheduleDefaults::default(),
            currency_label: "R$".to_string(),
        }
    }
}

/// Result of handling a payment that references a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// Lead id does not exist.
    LeadNotFound,
    /// Lead belongs to another owner than the one that resolved the payment.
    OwnerMismatch,
    /// Lead was converted and fully provisioned before; nothing written.
    AlreadyProvisioned { tenant_id: Option<TenantId> },
    /// Payment mirrored onto the lead; it is not paid, so nothing else happens.
    PaymentRecorded { status: LedgerStatus },
    /// The owner already has a tenant for the lead's email; nothing created.
    DuplicateTenant { tenant_id: TenantId },
    /// Every provisioning step has completed.
    Completed {
        tenant_id: TenantId,
        slug: String,
        account_created: bool,
    },
}

impl ProvisioningOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ProvisioningOutcome::LeadNotFound => "lead_not_found",
            ProvisioningOutcome::OwnerMismatch => "owner_mismatch",
            ProvisioningOutcome::AlreadyProvisioned { .. } => "already_provisioned",
            ProvisioningOutcome::PaymentRecorded { .. } => "lead_payment_recorded",
            ProvisioningOutcome::DuplicateTenant { .. } => "duplicate_tenant",
            ProvisioningOutcome::Completed { .. } => "tenant_provisioned",
        }
    }
}

enum TenantCreation {
    Created(Tenant),
    Duplicate(TenantId),
}

pub struct ProvisionTenantHandler {
    leads: Arc<dyn LeadRepository>,
    tenants: Arc<dyn TenantRepository>,
    setup: Arc<dyn TenantSetupRepository>,
    ledger: Arc<dyn LedgerRepository>,
    identity: Arc<dyn IdentityService>,
    settings: ProvisioningSettings,
}

impl ProvisionTenantHandler {
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        tenants: Arc<dyn TenantRepository>,
        setup: Arc<dyn TenantSetupRepository>,
        ledger: Arc<dyn LedgerRepository>,
        identity: Arc<dyn IdentityService>,
        settings: ProvisioningSettings,
    ) -> Self {
        Self {
            leads,
            tenants,
            setup,
            ledger,
            identity,
            settings,
        }
    }

    /// Handle a payment whose external reference names `lead_id`.
    ///
    /// `owner` is the owner whose credential fetched the payment.
    pub async fn handle(
        &self,
        owner: &TenantOwner,
        lead_id: LeadId,
        payment: &ProviderPayment,
    ) -> Result<ProvisioningOutcome, WebhookError> {
        // 1. Load lead and plan
        let Some((mut lead, plan)) = self.leads.find_with_plan(&lead_id).await? else {
            tracing::warn!(
                lead_id = %lead_id,
                payment_id = %payment.id,
                "Payment references unknown lead; ignoring"
            );
            return Ok(ProvisioningOutcome::LeadNotFound);
        };

        if lead.owner_id != owner.id {
            tracing::warn!(
                lead_id = %lead.id,
                owner_id = %owner.id,
                lead_owner_id = %lead.owner_id,
                payment_id = %payment.id,
                "Lead belongs to another owner; ignoring"
            );
            return Ok(ProvisioningOutcome::OwnerMismatch);
        }

        if lead.is_fully_provisioned() {
            tracing::info!(
                lead_id = %lead.id,
                payment_id = %payment.id,
                "Lead already provisioned; ignoring"
            );
            return Ok(ProvisioningOutcome::AlreadyProvisioned {
                tenant_id: lead.tenant_id,
            });
        }

        // 2. Mirror the payment onto the lead
        let now = Timestamp::now();
        let was_converted = lead.status == LeadStatus::Converted;
        let status = lead.record_payment(&payment.id, &payment.status, now)?;

        if !was_converted {
            self.leads.update(&lead).await?;
            self.audit(
                lead.id,
                AuditKind::PaymentStatusUpdated,
                format!("payment {} is {}", payment.id, payment.status),
            )
            .await;

            if lead.status == LeadStatus::Converted {
                tracing::info!(
                    lead_id = %lead.id,
                    owner_id = %owner.id,
                    payment_id = %payment.id,
                    "Lead converted"
                );
                self.audit(lead.id, AuditKind::Converted, format!("paid by payment {}", payment.id))
                    .await;
            }
        }

        if status != LedgerStatus::Paid {
            tracing::info!(
                lead_id = %lead.id,
                payment_id = %payment.id,
                status = %status,
                "Lead payment not approved; provisioning not started"
            );
            return Ok(ProvisioningOutcome::PaymentRecorded { status });
        }

        // 3. Duplicate guard, only before this lead has a tenant of its own.
        // A tenant this lead created on an earlier attempt is picked up again.
        let mut adopted = None;
        if lead.tenant_id.is_none() {
            if let Some(existing) = self
                .tenants
                .find_by_owner_and_email(&lead.owner_id, &lead.normalized_email())
                .await?
            {
                if !existing.was_created_by(&lead.id) {
                    self.skip_duplicate(&lead, existing.id).await;
                    return Ok(ProvisioningOutcome::DuplicateTenant {
                        tenant_id: existing.id,
                    });
                }
                tracing::info!(
                    lead_id = %lead.id,
                    tenant_id = %existing.id,
                    "Resuming with tenant from an earlier attempt"
                );
                adopted = Some(existing);
            }
        }

        // 4. Run the remaining steps
        self.run_steps(lead, &plan, payment, adopted, now).await
    }

    async fn run_steps(
        &self,
        mut lead: Lead,
        plan: &Plan,
        payment: &ProviderPayment,
        adopted: Option<Tenant>,
        now: Timestamp,
    ) -> Result<ProvisioningOutcome, WebhookError> {
        let mut first_failure: Option<DomainError> = None;

        // Tenant: every other step depends on it
        let tenant = match (lead.tenant_id, adopted) {
            (Some(tenant_id), _) => self.tenants.find_by_id(&tenant_id).await?.ok_or_else(|| {
                WebhookError::Internal(format!(
                    "lead {} references missing tenant {}",
                    lead.id, tenant_id
                ))
            })?,
            (None, Some(tenant)) => self.attach_tenant(&mut lead, tenant).await?,
            (None, None) => match self.create_tenant(&lead, plan, now).await {
                Ok(TenantCreation::Created(tenant)) => self.attach_tenant(&mut lead, tenant).await?,
                Ok(TenantCreation::Duplicate(tenant_id)) => {
                    self.skip_duplicate(&lead, tenant_id).await;
                    return Ok(ProvisioningOutcome::DuplicateTenant { tenant_id });
                }
                Err(err) => {
                    self.step_failed(&lead, "create_tenant", &err).await;
                    return Err(err.into());
                }
            },
        };

        // Config and schedule
        if !lead.provisioning_stage.has_reached(ProvisioningStage::ConfigSeeded) {
            match self.seed_tenant(&lead, &tenant).await {
                Ok(()) => {
                    advance(&mut lead, ProvisioningStage::ConfigSeeded);
                }
                Err(err) => {
                    first_failure.get_or_insert(err);
                }
            }
        }

        // Account: also needed to bind, so resolved until the binding exists
        let mut account: Option<Account> = None;
        if !lead.provisioning_stage.has_reached(ProvisioningStage::Bound) {
            match self.ensure_account(&lead).await {
                Ok((found, created)) => {
                    advance(&mut lead, ProvisioningStage::AccountCreated);
                    lead.owner_account_created |= created;
                    account = Some(found);
                }
                Err(err) => {
                    self.step_failed(&lead, "create_account", &err).await;
                    first_failure.get_or_insert(err);
                }
            }
        }

        // Owner binding
        if !lead.provisioning_stage.has_reached(ProvisioningStage::Bound) {
            if let Some(account) = &account {
                let binding = OwnerBinding::owner(account.id, tenant.id);
                match self.setup.bind_owner(&binding).await {
                    Ok(()) => {
                        advance(&mut lead, ProvisioningStage::Bound);
                        self.audit(
                            lead.id,
                            AuditKind::OwnerBound,
                            format!("account {} owns tenant {}", account.id, tenant.id),
                        )
                        .await;
                    }
                    Err(err) => {
                        self.step_failed(&lead, "bind_owner", &err).await;
                        first_failure.get_or_insert(err);
                    }
                }
            }
        }

        // Completion
        if lead.provisioning_stage == ProvisioningStage::Bound {
            let entry = LedgerEntry::from_payment(tenant.id, &payment.as_ledger_payment(), now);
            match self.ledger.insert(&entry).await {
                Ok(result) => {
                    if result == SaveResult::AlreadyExists {
                        tracing::debug!(
                            lead_id = %lead.id,
                            payment_id = %payment.id,
                            "Ledger entry already recorded"
                        );
                    }
                    advance(&mut lead, ProvisioningStage::Done);
                    self.complete(&lead, &tenant, &entry).await;
                }
                Err(err) => {
                    self.step_failed(&lead, "record_payment", &err).await;
                    first_failure.get_or_insert(err);
                }
            }
        }

        lead.updated_at = Timestamp::now();
        self.leads.update(&lead).await?;

        if lead.provisioning_stage == ProvisioningStage::Done {
            return Ok(ProvisioningOutcome::Completed {
                tenant_id: tenant.id,
                slug: tenant.slug,
                account_created: lead.owner_account_created,
            });
        }

        tracing::error!(
            lead_id = %lead.id,
            tenant_id = %tenant.id,
            stage = %lead.provisioning_stage,
            "Provisioning incomplete; awaiting redelivery"
        );
        Err(match first_failure {
            Some(err) => err.into(),
            None => WebhookError::Internal(format!(
                "provisioning stopped at stage {}",
                lead.provisioning_stage
            )),
        })
    }

    /// Inserts the tenant, retrying with the next free slug when a
    /// concurrent insert takes the chosen one.
    async fn create_tenant(
        &self,
        lead: &Lead,
        plan: &Plan,
        now: Timestamp,
    ) -> Result<TenantCreation, DomainError> {
        let base = slugify(&lead.business_name);
        let email = lead.normalized_email();
        let mut attempt = 0;

        for _ in 0..MAX_INSERT_ATTEMPTS {
            let (slug, used) = self.free_slug(&base, attempt).await?;
            let tenant = Tenant::provision(
                NewTenant {
                    owner_id: lead.owner_id,
                    name: &lead.business_name,
                    slug,
                    contact_email: &email,
                    contact_phone: lead.phone.as_deref(),
                    plan,
                },
                now,
            )
            .for_lead(lead.id);

            match self.tenants.insert(&tenant).await {
                Ok(()) => return Ok(TenantCreation::Created(tenant)),
                Err(err) if err.code == ErrorCode::SlugTaken => {
                    tracing::warn!(
                        lead_id = %lead.id,
                        slug = %tenant.slug,
                        "Slug taken concurrently; retrying"
                    );
                    attempt = used + 1;
                }
                Err(err) if err.code == ErrorCode::Conflict => {
                    return match self
                        .tenants
                        .find_by_owner_and_email(&lead.owner_id, &email)
                        .await?
                    {
                        Some(existing) if existing.was_created_by(&lead.id) => {
                            Ok(TenantCreation::Created(existing))
                        }
                        Some(existing) => Ok(TenantCreation::Duplicate(existing.id)),
                        None => Err(err),
                    };
                }
                Err(err) => return Err(err),
            }
        }

        Err(DomainError::new(
            ErrorCode::SlugTaken,
            format!("no free slug for '{}'", base),
        ))
    }

    /// Links the tenant to the lead and persists the first stage.
    async fn attach_tenant(&self, lead: &mut Lead, tenant: Tenant) -> Result<Tenant, WebhookError> {
        lead.tenant_id = Some(tenant.id);
        advance(lead, ProvisioningStage::TenantCreated);
        self.leads.update(lead).await?;
        tracing::info!(
            lead_id = %lead.id,
            tenant_id = %tenant.id,
            slug = %tenant.slug,
            "Tenant created"
        );
        self.audit(
            lead.id,
            AuditKind::TenantCreated,
            format!("tenant {} ({})", tenant.id, tenant.slug),
        )
        .await;
        Ok(tenant)
    }

    /// First unused candidate at or after `start`, with its attempt number.
    async fn free_slug(&self, base: &str, start: u32) -> Result<(String, u32), DomainError> {
        for attempt in start..start + MAX_SLUG_PROBES {
            let candidate = slug_candidate(base, attempt);
            if !self.tenants.slug_exists(&candidate).await? {
                return Ok((candidate, attempt));
            }
        }
        Err(DomainError::new(
            ErrorCode::SlugTaken,
            format!("no free slug for '{}'", base),
        ))
    }

    /// Seeds config and schedule. Both are attempted; the first failure is returned.
    async fn seed_tenant(&self, lead: &Lead, tenant: &Tenant) -> Result<(), DomainError> {
        let config = TenantConfig::seed(tenant.id, &tenant.name, tenant.contact_phone.as_deref());
        let config_result = self.setup.save_config(&config).await;
        match &config_result {
            Ok(()) => {
                self.audit(lead.id, AuditKind::ConfigSeeded, format!("tenant {}", tenant.id))
                    .await
            }
            Err(err) => self.step_failed(lead, "seed_config", err).await,
        }

        let week = default_week(tenant.id, &self.settings.schedule);
        let schedule_result = self.setup.save_schedule(&week).await;
        match &schedule_result {
            Ok(()) => {
                self.audit(
                    lead.id,
                    AuditKind::ScheduleSeeded,
                    format!(
                        "{} days, {}-{}",
                        week.len(),
                        self.settings.schedule.opens_at.format("%H:%M"),
                        self.settings.schedule.closes_at.format("%H:%M")
                    ),
                )
                .await
            }
            Err(err) => self.step_failed(lead, "seed_schedule", err).await,
        }

        config_result.and(schedule_result)
    }

    /// Returns the lead's account and whether it was created by this call.
    /// An account created by an earlier attempt is found, not created.
    async fn ensure_account(&self, lead: &Lead) -> Result<(Account, bool), DomainError> {
        let email = lead.normalized_email();
        let seen_before = lead.owner_account_created
            || lead
                .provisioning_stage
                .has_reached(ProvisioningStage::AccountCreated);

        if let Some(account) = self.identity.find_account_by_email(&email).await? {
            if !seen_before {
                self.audit(lead.id, AuditKind::AccountReused, format!("account {}", account.id))
                    .await;
            }
            return Ok((account, false));
        }

        let credential = TemporaryCredential::generate();
        let account = self
            .identity
            .create_account(&email, credential.secret())
            .await?;

        tracing::info!(
            lead_id = %lead.id,
            account_id = %account.id,
            "Owner account created"
        );
        self.audit(lead.id, AuditKind::AccountCreated, format!("account {}", account.id))
            .await;
        self.note(
            lead.id,
            format!(
                "Owner account created for {}. Temporary password: {}",
                email,
                credential.expose()
            ),
        )
        .await;

        Ok((account, true))
    }

    async fn complete(&self, lead: &Lead, tenant: &Tenant, entry: &LedgerEntry) {
        let account = if lead.owner_account_created {
            "new owner account"
        } else {
            "existing owner account"
        };
        let setup_fee = tenant
            .setup_fee_cents
            .map(|cents| format!(", setup fee {}", format_amount(&self.settings.currency_label, cents)))
            .unwrap_or_default();

        self.note(
            lead.id,
            format!(
                "Tenant {} provisioned at /{} with {}. Paid {}{}, monthly fee {}.",
                tenant.name,
                tenant.slug,
                account,
                format_amount(&self.settings.currency_label, entry.amount_cents),
                setup_fee,
                format_amount(&self.settings.currency_label, tenant.monthly_fee_cents),
            ),
        )
        .await;
        self.audit(
            lead.id,
            AuditKind::ProvisioningCompleted,
            format!("tenant {} ({})", tenant.id, tenant.slug),
        )
        .await;

        tracing::info!(
            lead_id = %lead.id,
            tenant_id = %tenant.id,
            owner_id = %lead.owner_id,
            payment_id = %entry.provider_payment_id,
            "Provisioning completed"
        );
    }

    async fn skip_duplicate(&self, lead: &Lead, tenant_id: TenantId) {
        tracing::warn!(
            lead_id = %lead.id,
            tenant_id = %tenant_id,
            owner_id = %lead.owner_id,
            "Owner already has a tenant for this email; provisioning skipped"
        );
        self.note(
            lead.id,
            format!(
                "Tenant not created: {} already has tenant {} under this owner.",
                lead.normalized_email(),
                tenant_id
            ),
        )
        .await;
        self.audit(
            lead.id,
            AuditKind::DuplicateTenantSkipped,
            format!("existing tenant {}", tenant_id),
        )
        .await;
    }

    async fn step_failed(&self, lead: &Lead, step: &'static str, err: &DomainError) {
        tracing::error!(
            lead_id = %lead.id,
            step,
            error = %err,
            "Provisioning step failed"
        );
        self.audit(lead.id, AuditKind::StepFailed, format!("{}: {}", step, err))
            .await;
        self.note(
            lead.id,
            format!("Provisioning step {} failed: {}", step, err.message()),
        )
        .await;
    }

    // Audit and notes are best effort; a failed write is logged only.

    async fn audit(&self, lead_id: LeadId, kind: AuditKind, detail: String) {
        let entry = LeadAuditEntry::new(lead_id, kind, detail, Timestamp::now());
        if let Err(err) = self.leads.append_audit(&entry).await {
            tracing::warn!(lead_id = %lead_id, kind = %kind, error = %err, "Failed to write audit entry");
        }
    }

    async fn note(&self, lead_id: LeadId, note: String) {
        if let Err(err) = self.leads.append_note(&lead_id, &note).await {
            tracing::warn!(lead_id = %lead_id, error = %err, "Failed to append lead note");
        }
    }
}

/// Moves the lead to `target` if it is the next stage.
fn advance(lead: &mut Lead, target: ProvisioningStage) {
    if let Ok(next) = lead.provisioning_stage.transition_to(target) {
        lead.provisioning_stage = next;
    }
}

fn format_amount(currency_label: &str, cents: i64) -> String {
    format!("{} {}.{:02}", currency_label, cents / 100, (cents % 100).abs())
}
