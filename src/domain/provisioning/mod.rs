//! Provisioning domain: leads and everything seeded when one converts.

mod audit;
mod credential;
mod lead;
mod schedule;
mod setup;
mod slug;
mod stage;

pub use audit::{AuditKind, LeadAuditEntry};
pub use credential::TemporaryCredential;
pub use lead::{Lead, LeadStatus};
pub use schedule::{default_week, DefaultScheduleEntry, ScheduleDefaults};
pub use setup::{OwnerBinding, TenantConfig};
pub use slug::{slug_candidate, slugify, FALLBACK_SLUG};
pub use stage::ProvisioningStage;
