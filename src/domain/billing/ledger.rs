//! Subscription payment ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{LedgerEntryId, TenantId, Timestamp, ValidationError};

use super::status_mapping::map_payment_state;

/// Status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Paid,
    Cancelled,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Paid => "paid",
            LedgerStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LedgerStatus::Pending),
            "paid" => Ok(LedgerStatus::Paid),
            "cancelled" => Ok(LedgerStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "ledger_status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

/// Converts a provider decimal amount to integer cents, rounding half away from zero.
pub fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// One recorded payment attempt/outcome for a tenant.
///
/// `provider_payment_id` is the idempotency key and is unique across the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub tenant_id: TenantId,
    pub provider_payment_id: String,
    pub status: LedgerStatus,
    pub amount_cents: i64,
    pub due_date: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub payment_method: Option<String>,
    pub note: String,
    pub created_at: Timestamp,
}

/// The parts of a provider payment a ledger entry is built from.
#[derive(Debug, Clone)]
pub struct LedgerPayment<'a> {
    pub provider_payment_id: &'a str,
    pub provider_status: &'a str,
    pub status_detail: Option<&'a str>,
    pub amount: f64,
    pub payment_method: Option<&'a str>,
    pub created_at: Option<Timestamp>,
    pub approved_at: Option<Timestamp>,
}

impl LedgerEntry {
    /// Builds an entry with its status mapped from the provider's payment state.
    pub fn from_payment(tenant_id: TenantId, payment: &LedgerPayment<'_>, now: Timestamp) -> Self {
        let status = map_payment_state(payment.provider_status);
        let paid_at = match status {
            LedgerStatus::Paid => Some(payment.approved_at.unwrap_or(now)),
            _ => None,
        };

        let note = match payment.status_detail {
            Some(detail) => format!(
                "Provider payment {} ({} / {})",
                payment.provider_payment_id, payment.provider_status, detail
            ),
            None => format!(
                "Provider payment {} ({})",
                payment.provider_payment_id, payment.provider_status
            ),
        };

        Self {
            id: LedgerEntryId::new(),
            tenant_id,
            provider_payment_id: payment.provider_payment_id.to_string(),
            status,
            amount_cents: amount_to_cents(payment.amount),
            due_date: payment.created_at.unwrap_or(now),
            paid_at,
            payment_method: payment.payment_method.map(str::to_string),
            note,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment<'a>(status: &'a str) -> LedgerPayment<'a> {
        LedgerPayment {
            provider_payment_id: "1234567890",
            provider_status: status,
            status_detail: Some("accredited"),
            amount: 99.9,
            payment_method: Some("pix"),
            created_at: None,
            approved_at: None,
        }
    }

    #[test]
    fn amount_to_cents_rounds_float_noise() {
        assert_eq!(amount_to_cents(99.9), 9990);
        assert_eq!(amount_to_cents(0.1 + 0.2), 30);
        assert_eq!(amount_to_cents(19.99), 1999);
    }

    #[test]
    fn approved_payment_becomes_paid_entry() {
        let now = Timestamp::now();
        let entry = LedgerEntry::from_payment(TenantId::new(), &payment("approved"), now);

        assert_eq!(entry.status, LedgerStatus::Paid);
        assert_eq!(entry.paid_at, Some(now));
        assert_eq!(entry.amount_cents, 9990);
        assert_eq!(entry.payment_method.as_deref(), Some("pix"));
        assert!(entry.note.contains("1234567890"));
        assert!(entry.note.contains("accredited"));
    }

    #[test]
    fn rejected_payment_has_no_paid_date() {
        let entry = LedgerEntry::from_payment(TenantId::new(), &payment("rejected"), Timestamp::now());
        assert_eq!(entry.status, LedgerStatus::Cancelled);
        assert!(entry.paid_at.is_none());
    }

    #[test]
    fn provider_dates_take_precedence() {
        let created = Timestamp::now().add_days(-2);
        let approved = Timestamp::now().add_days(-1);
        let mut p = payment("approved");
        p.created_at = Some(created);
        p.approved_at = Some(approved);

        let entry = LedgerEntry::from_payment(TenantId::new(), &p, Timestamp::now());

        assert_eq!(entry.due_date, created);
        assert_eq!(entry.paid_at, Some(approved));
    }

    #[test]
    fn ledger_status_parses_known_values() {
        assert_eq!("paid".parse::<LedgerStatus>().unwrap(), LedgerStatus::Paid);
        assert!("refunded".parse::<LedgerStatus>().is_err());
    }
}
