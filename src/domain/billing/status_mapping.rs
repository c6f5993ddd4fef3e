//! Provider state mapping.
//!
//! Pure, total functions translating the payment provider's raw state strings
//! into internal statuses. Unknown values never fail: they fall back to the
//! most conservative internal state.

use super::{LedgerStatus, SubscriptionStatus};

/// Maps a provider subscription (preapproval) state to a tenant subscription status.
///
/// | provider     | internal    |
/// |--------------|-------------|
/// | `authorized` | `active`    |
/// | `paused`     | `suspended` |
/// | `cancelled`  | `cancelled` |
/// | `pending`    | `trial`     |
/// | anything else| `suspended` |
pub fn map_subscription_state(provider_state: &str) -> SubscriptionStatus {
    match normalise(provider_state).as_str() {
        "authorized" => SubscriptionStatus::Active,
        "paused" => SubscriptionStatus::Suspended,
        "cancelled" => SubscriptionStatus::Cancelled,
        "pending" => SubscriptionStatus::Trial,
        _ => SubscriptionStatus::Suspended,
    }
}

/// Maps a provider payment state to a ledger status.
///
/// | provider                  | internal    |
/// |---------------------------|-------------|
/// | `approved`                | `paid`      |
/// | `pending`, `in_process`   | `pending`   |
/// | `rejected`, `cancelled`   | `cancelled` |
/// | anything else             | `pending`   |
pub fn map_payment_state(provider_state: &str) -> LedgerStatus {
    match normalise(provider_state).as_str() {
        "approved" => LedgerStatus::Paid,
        "pending" | "in_process" => LedgerStatus::Pending,
        "rejected" | "cancelled" => LedgerStatus::Cancelled,
        _ => LedgerStatus::Pending,
    }
}

fn normalise(state: &str) -> String {
    state.trim().to_ascii_lowercase()
}
