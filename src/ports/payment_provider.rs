//! Payment provider port for the billing reconciler.
//!
//! Every call is a read-only fetch authenticated with one tenant owner's
//! credential. The reconciler never mutates provider-side state.
//!
//! # Design
//!
//! - **Per-owner credentials**: the caller chooses which owner to act as
//! - **Raw states**: provider status strings are passed through untouched and
//!   mapped by the domain
//! - **Typed failures**: `PaymentError::retryable` decides between redelivery
//!   and a logged no-op

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{LedgerPayment, ProviderCredential, WebhookError};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch a recurring subscription (preapproval) by id.
    async fn fetch_subscription(
        &self,
        credential: &ProviderCredential,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError>;

    /// Fetch a payment by id.
    async fn fetch_payment(
        &self,
        credential: &ProviderCredential,
        payment_id: &str,
    ) -> Result<ProviderPayment, PaymentError>;

    /// Fetch a merchant order by id.
    async fn fetch_merchant_order(
        &self,
        credential: &ProviderCredential,
        order_id: &str,
    ) -> Result<ProviderMerchantOrder, PaymentError>;
}

/// Recurring subscription as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    /// Raw provider state (`authorized`, `paused`, ...).
    pub status: String,
    pub external_reference: Option<String>,
    pub reason: Option<String>,
    pub payer_email: Option<String>,
}

/// Payment as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayment {
    pub id: String,
    /// Raw provider state (`approved`, `rejected`, ...).
    pub status: String,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    /// Decimal amount in the payment currency.
    pub transaction_amount: f64,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub date_created: Option<Timestamp>,
    pub date_approved: Option<Timestamp>,
    pub payer_email: Option<String>,
}

impl ProviderPayment {
    /// View used to build a ledger entry.
    pub fn as_ledger_payment(&self) -> LedgerPayment<'_> {
        LedgerPayment {
            provider_payment_id: &self.id,
            provider_status: &self.status,
            status_detail: self.status_detail.as_deref(),
            amount: self.transaction_amount,
            payment_method: self
                .payment_method_id
                .as_deref()
                .or(self.payment_type_id.as_deref()),
            created_at: self.date_created,
            approved_at: self.date_approved,
        }
    }
}

/// Order bundling zero or more payments, used by one-off checkouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMerchantOrder {
    pub id: String,
    pub status: Option<String>,
    pub external_reference: Option<String>,
    pub payments: Vec<MerchantOrderPayment>,
}

/// Payment summary embedded in a merchant order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantOrderPayment {
    pub id: String,
    pub status: String,
    pub transaction_amount: Option<f64>,
}

impl MerchantOrderPayment {
    pub fn is_approved(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("approved")
    }
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::RateLimitExceeded, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create a generic provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == PaymentErrorCode::NotFound
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        WebhookError::Provider {
            message: err.to_string(),
            retryable: err.retryable,
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Request exceeded the configured timeout.
    Timeout,

    /// Credential rejected (401/403).
    AuthenticationError,

    /// Resource not found, or not visible to this credential.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
