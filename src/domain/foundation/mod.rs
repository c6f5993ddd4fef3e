//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and error types
//! that form the vocabulary of the billing domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AccountId, LeadId, LedgerEntryId, PlanId, TenantId, TenantOwnerId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
