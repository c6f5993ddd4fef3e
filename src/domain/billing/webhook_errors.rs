//! Webhook error types for billing notification handling.
//!
//! Maps every failure to an HTTP status. Anything that reaches the ingress as
//! an error answers 5xx so the provider redelivers, except signature failures.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature header missing or malformed.
    #[error("Signature format error: {0}")]
    SignatureFormat(String),

    /// Payment provider call failed.
    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Identity service call failed.
    #[error("Identity service error: {0}")]
    Identity(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Returns true if a redelivery of the same notification may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::InvalidSignature | WebhookError::SignatureFormat(_) => false,
            WebhookError::Provider { retryable, .. } => *retryable,
            WebhookError::Database(_) | WebhookError::Identity(_) => true,
            WebhookError::Internal(_) => false,
        }
    }

    /// Maps the error to an HTTP status code.
    ///
    /// - 401: signature rejected, no retry
    /// - 500: everything else, provider will redeliver
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::SignatureFormat(_) => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::Provider { .. }
            | WebhookError::Database(_)
            | WebhookError::Identity(_)
            | WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DatabaseError | ErrorCode::Conflict | ErrorCode::SlugTaken => {
                WebhookError::Database(err.to_string())
            }
            ErrorCode::ExternalServiceError => WebhookError::Identity(err.to_string()),
            _ => WebhookError::Internal(err.to_string()),
        }
    }
}
