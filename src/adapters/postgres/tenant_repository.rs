//! PostgreSQL implementation of TenantRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{SubscriptionStatus, SubscriptionSync, Tenant};
use crate::domain::foundation::{
    DomainError, ErrorCode, LeadId, TenantId, TenantOwnerId, Timestamp,
};
use crate::ports::TenantRepository;

use super::{corrupt_row, database_error};

const SLUG_CONSTRAINT: &str = "tenants_slug_key";
const OWNER_EMAIL_CONSTRAINT: &str = "tenants_owner_email_key";

const SELECT_TENANT: &str = r#"
    SELECT id, owner_id, name, slug, contact_email, contact_phone, subscription_status,
           is_active, provider_subscription_id, provider_subscription_state,
           monthly_fee_cents, setup_fee_cents, trial_days, subscription_started_at,
           subscription_ends_at, source_lead_id, created_at, updated_at
    FROM tenants
"#;

pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    slug: String,
    contact_email: String,
    contact_phone: Option<String>,
    subscription_status: String,
    is_active: bool,
    provider_subscription_id: Option<String>,
    provider_subscription_state: Option<String>,
    monthly_fee_cents: i64,
    setup_fee_cents: Option<i64>,
    trial_days: i32,
    subscription_started_at: DateTime<Utc>,
    subscription_ends_at: DateTime<Utc>,
    source_lead_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let subscription_status: SubscriptionStatus = row
            .subscription_status
            .parse()
            .map_err(|_| corrupt_row("subscription_status", &row.subscription_status))?;
        let trial_days =
            u32::try_from(row.trial_days).map_err(|_| corrupt_row("trial_days", row.trial_days))?;

        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            owner_id: TenantOwnerId::from_uuid(row.owner_id),
            name: row.name,
            slug: row.slug,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            subscription_status,
            is_active: row.is_active,
            provider_subscription_id: row.provider_subscription_id,
            provider_subscription_state: row.provider_subscription_state,
            monthly_fee_cents: row.monthly_fee_cents,
            setup_fee_cents: row.setup_fee_cents,
            trial_days,
            subscription_started_at: Timestamp::from_datetime(row.subscription_started_at),
            subscription_ends_at: Timestamp::from_datetime(row.subscription_ends_at),
            source_lead_id: row.source_lead_id.map(LeadId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_TENANT))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("find tenant", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_provider_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "{} WHERE provider_subscription_id = $1 LIMIT 1",
            SELECT_TENANT
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find tenant by subscription", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_owner_and_email(
        &self,
        owner_id: &TenantOwnerId,
        email: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "{} WHERE owner_id = $1 AND lower(contact_email) = $2",
            SELECT_TENANT
        ))
        .bind(owner_id.as_uuid())
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find tenant by email", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("check slug", e))
    }

    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, owner_id, name, slug, contact_email, contact_phone,
                subscription_status, is_active, provider_subscription_id,
                provider_subscription_state, monthly_fee_cents, setup_fee_cents,
                trial_days, subscription_started_at, subscription_ends_at,
                source_lead_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(tenant.owner_id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(&tenant.contact_email)
        .bind(&tenant.contact_phone)
        .bind(tenant.subscription_status.as_str())
        .bind(tenant.is_active)
        .bind(&tenant.provider_subscription_id)
        .bind(&tenant.provider_subscription_state)
        .bind(tenant.monthly_fee_cents)
        .bind(tenant.setup_fee_cents)
        .bind(i32::try_from(tenant.trial_days).unwrap_or(i32::MAX))
        .bind(tenant.subscription_started_at.as_datetime())
        .bind(tenant.subscription_ends_at.as_datetime())
        .bind(tenant.source_lead_id.map(|id| *id.as_uuid()))
        .bind(tenant.created_at.as_datetime())
        .bind(tenant.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some(SLUG_CONSTRAINT) => {
                        return DomainError::new(
                            ErrorCode::SlugTaken,
                            format!("slug '{}' already in use", tenant.slug),
                        )
                    }
                    Some(OWNER_EMAIL_CONSTRAINT) => {
                        return DomainError::conflict("owner already has a tenant for this email")
                    }
                    _ => {}
                }
            }
            database_error("insert tenant", e)
        })?;

        Ok(())
    }

    async fn apply_subscription_sync(
        &self,
        id: &TenantId,
        sync: &SubscriptionSync,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                subscription_status = $2,
                is_active = $3,
                provider_subscription_state = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(sync.status.as_str())
        .bind(sync.is_active)
        .bind(&sync.provider_state)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("update tenant subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::NotFound, "tenant not found"));
        }
        Ok(())
    }

    async fn mark_payment_approved(&self, id: &TenantId, now: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                subscription_status = $2,
                is_active = TRUE,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(SubscriptionStatus::Active.as_str())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("mark tenant paid", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::NotFound, "tenant not found"));
        }
        Ok(())
    }
}
