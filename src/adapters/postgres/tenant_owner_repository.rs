//! PostgreSQL implementation of TenantOwnerRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{ProviderCredential, TenantOwner};
use crate::domain::foundation::{DomainError, TenantOwnerId, Timestamp};
use crate::ports::TenantOwnerRepository;

use super::database_error;

pub struct PostgresTenantOwnerRepository {
    pool: PgPool,
}

impl PostgresTenantOwnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TenantOwnerRow {
    id: Uuid,
    name: String,
    access_token: String,
    billing_enabled: bool,
    created_at: DateTime<Utc>,
}

impl From<TenantOwnerRow> for TenantOwner {
    fn from(row: TenantOwnerRow) -> Self {
        TenantOwner {
            id: TenantOwnerId::from_uuid(row.id),
            name: row.name,
            credential: ProviderCredential::new(row.access_token),
            billing_enabled: row.billing_enabled,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl TenantOwnerRepository for PostgresTenantOwnerRepository {
    async fn find_by_id(&self, id: &TenantOwnerId) -> Result<Option<TenantOwner>, DomainError> {
        let row: Option<TenantOwnerRow> = sqlx::query_as(
            r#"
            SELECT id, name, access_token, billing_enabled, created_at
            FROM tenant_owners
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find tenant owner", e))?;

        Ok(row.map(TenantOwner::from))
    }

    async fn list_billing_enabled(&self) -> Result<Vec<TenantOwner>, DomainError> {
        let rows: Vec<TenantOwnerRow> = sqlx::query_as(
            r#"
            SELECT id, name, access_token, billing_enabled, created_at
            FROM tenant_owners
            WHERE billing_enabled
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list tenant owners", e))?;

        Ok(rows.into_iter().map(TenantOwner::from).collect())
    }
}
