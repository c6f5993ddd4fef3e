//! PostgreSQL adapters for the billing storage ports.
//!
//! Uniqueness rules live in the schema (see `migrations/`); violations are
//! mapped to domain error codes by constraint name.

mod lead_repository;
mod ledger_repository;
mod tenant_owner_repository;
mod tenant_repository;
mod tenant_setup_repository;

pub use lead_repository::PostgresLeadRepository;
pub use ledger_repository::PostgresLedgerRepository;
pub use tenant_owner_repository::PostgresTenantOwnerRepository;
pub use tenant_repository::PostgresTenantRepository;
pub use tenant_setup_repository::PostgresTenantSetupRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

fn database_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn corrupt_row(column: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, value),
    )
}
