//! PostgreSQL implementation of LedgerRepository.
//!
//! The unique `provider_payment_id` constraint is what makes recording
//! idempotent; `ON CONFLICT DO NOTHING` turns a duplicate into `AlreadyExists`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::LedgerEntry;
use crate::domain::foundation::DomainError;
use crate::ports::{LedgerRepository, SaveResult};

use super::database_error;

pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn exists_for_payment(&self, provider_payment_id: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ledger_entries WHERE provider_payment_id = $1)",
        )
        .bind(provider_payment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("check ledger", e))?;

        Ok(exists)
    }

    async fn insert(&self, entry: &LedgerEntry) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, tenant_id, provider_payment_id, status, amount_cents,
                due_date, paid_at, payment_method, note, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (provider_payment_id) DO NOTHING
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.tenant_id.as_uuid())
        .bind(&entry.provider_payment_id)
        .bind(entry.status.as_str())
        .bind(entry.amount_cents)
        .bind(entry.due_date.as_datetime())
        .bind(entry.paid_at.as_ref().map(|t| *t.as_datetime()))
        .bind(&entry.payment_method)
        .bind(&entry.note)
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("insert ledger entry", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }
}
