//! PostgreSQL implementation of LeadRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::Plan;
use crate::domain::foundation::{
    DomainError, ErrorCode, LeadId, PlanId, TenantId, TenantOwnerId, Timestamp,
};
use crate::domain::provisioning::{Lead, LeadAuditEntry, LeadStatus, ProvisioningStage};
use crate::ports::LeadRepository;

use super::{corrupt_row, database_error};

pub struct PostgresLeadRepository {
    pool: PgPool,
}

impl PostgresLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lead joined with its plan.
#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    owner_id: Uuid,
    plan_id: Uuid,
    business_name: String,
    contact_name: String,
    email: String,
    phone: Option<String>,
    status: String,
    provider_payment_id: Option<String>,
    provider_payment_status: Option<String>,
    tenant_id: Option<Uuid>,
    provisioning_stage: String,
    owner_account_created: bool,
    notes: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    plan_name: String,
    plan_monthly_fee_cents: i64,
    plan_setup_fee_cents: Option<i64>,
    plan_trial_days: i32,
}

impl TryFrom<LeadRow> for (Lead, Plan) {
    type Error = DomainError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let status: LeadStatus = row
            .status
            .parse()
            .map_err(|_| corrupt_row("lead status", &row.status))?;
        let provisioning_stage: ProvisioningStage = row
            .provisioning_stage
            .parse()
            .map_err(|_| corrupt_row("provisioning_stage", &row.provisioning_stage))?;
        let trial_days = u32::try_from(row.plan_trial_days)
            .map_err(|_| corrupt_row("trial_days", row.plan_trial_days))?;

        let plan = Plan {
            id: PlanId::from_uuid(row.plan_id),
            name: row.plan_name,
            monthly_fee_cents: row.plan_monthly_fee_cents,
            setup_fee_cents: row.plan_setup_fee_cents,
            trial_days,
        };
        let lead = Lead {
            id: LeadId::from_uuid(row.id),
            owner_id: TenantOwnerId::from_uuid(row.owner_id),
            plan_id: plan.id,
            business_name: row.business_name,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            status,
            provider_payment_id: row.provider_payment_id,
            provider_payment_status: row.provider_payment_status,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            provisioning_stage,
            owner_account_created: row.owner_account_created,
            notes: row.notes,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        };

        Ok((lead, plan))
    }
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn find_with_plan(&self, id: &LeadId) -> Result<Option<(Lead, Plan)>, DomainError> {
        let row: Option<LeadRow> = sqlx::query_as(
            r#"
            SELECT
                l.id, l.owner_id, l.plan_id, l.business_name, l.contact_name, l.email,
                l.phone, l.status, l.provider_payment_id, l.provider_payment_status,
                l.tenant_id, l.provisioning_stage, l.owner_account_created, l.notes, l.created_at, l.updated_at,
                p.name AS plan_name,
                p.monthly_fee_cents AS plan_monthly_fee_cents,
                p.setup_fee_cents AS plan_setup_fee_cents,
                p.trial_days AS plan_trial_days
            FROM leads l
            JOIN plans p ON p.id = l.plan_id
            WHERE l.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find lead", e))?;

        row.map(<(Lead, Plan)>::try_from).transpose()
    }

    async fn update(&self, lead: &Lead) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE leads SET
                status = $2,
                provider_payment_id = $3,
                provider_payment_status = $4,
                tenant_id = $5,
                provisioning_stage = $6,
                owner_account_created = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(lead.id.as_uuid())
        .bind(lead.status.as_str())
        .bind(&lead.provider_payment_id)
        .bind(&lead.provider_payment_status)
        .bind(lead.tenant_id.map(|id| *id.as_uuid()))
        .bind(lead.provisioning_stage.as_str())
        .bind(lead.owner_account_created)
        .bind(lead.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("update lead", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::NotFound, "lead not found"));
        }
        Ok(())
    }

    async fn append_note(&self, id: &LeadId, note: &str) -> Result<(), DomainError> {
        sqlx::query("UPDATE leads SET notes = array_append(notes, $2) WHERE id = $1")
            .bind(id.as_uuid())
            .bind(note)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("append lead note", e))?;
        Ok(())
    }

    async fn append_audit(&self, entry: &LeadAuditEntry) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO lead_audit_log (lead_id, kind, detail, at) VALUES ($1, $2, $3, $4)")
            .bind(entry.lead_id.as_uuid())
            .bind(entry.kind.as_str())
            .bind(&entry.detail)
            .bind(entry.at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("write lead audit", e))?;
        Ok(())
    }
}
