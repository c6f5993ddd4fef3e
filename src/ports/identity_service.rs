//! Identity service port - account lookup and creation.
//!
//! Both operations are safe to repeat for the same email.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::{AccountId, DomainError};

/// An account known to the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DomainError>;

    /// Create an account with a temporary password.
    ///
    /// # Errors
    ///
    /// - `ExternalServiceError` if the identity service fails
    async fn create_account(
        &self,
        email: &str,
        temporary_password: &SecretString,
    ) -> Result<Account, DomainError>;
}
