//! PostgreSQL implementation of TenantSetupRepository.
//!
//! Every write is an upsert so a resumed provisioning run can repeat it.

use async_trait::async_trait;
use chrono::Weekday;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::domain::provisioning::{DefaultScheduleEntry, OwnerBinding, TenantConfig};
use crate::ports::TenantSetupRepository;

use super::database_error;

pub struct PostgresTenantSetupRepository {
    pool: PgPool,
}

impl PostgresTenantSetupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Stored weekday number, Sunday = 0.
fn weekday_number(weekday: Weekday) -> i16 {
    weekday.num_days_from_sunday() as i16
}

#[async_trait]
impl TenantSetupRepository for PostgresTenantSetupRepository {
    async fn save_config(&self, config: &TenantConfig) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_configs (tenant_id, name, phone, is_open)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone
            "#,
        )
        .bind(config.tenant_id.as_uuid())
        .bind(&config.name)
        .bind(&config.phone)
        .bind(config.is_open)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("save tenant config", e))?;
        Ok(())
    }

    async fn save_schedule(&self, entries: &[DefaultScheduleEntry]) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("begin schedule transaction", e))?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO tenant_schedules (tenant_id, weekday, opens_at, closes_at, is_active)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (tenant_id, weekday) DO UPDATE SET
                    opens_at = EXCLUDED.opens_at,
                    closes_at = EXCLUDED.closes_at,
                    is_active = EXCLUDED.is_active
                "#,
            )
            .bind(entry.tenant_id.as_uuid())
            .bind(weekday_number(entry.weekday))
            .bind(entry.opens_at)
            .bind(entry.closes_at)
            .bind(entry.is_active)
            .execute(&mut *tx)
            .await
            .map_err(|e| database_error("save tenant schedule", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| database_error("commit tenant schedule", e))
    }

    async fn bind_owner(&self, binding: &OwnerBinding) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_members (account_id, tenant_id, is_owner)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, tenant_id) DO UPDATE SET is_owner = EXCLUDED.is_owner
            "#,
        )
        .bind(binding.account_id.as_uuid())
        .bind(binding.tenant_id.as_uuid())
        .bind(binding.is_owner)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("bind tenant owner", e))?;
        Ok(())
    }
}
