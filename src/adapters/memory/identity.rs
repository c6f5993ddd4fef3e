//! In-memory identity service.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::{Account, IdentityService};

#[derive(Default)]
struct IdentityState {
    /// Accounts keyed by lower-cased email.
    accounts: HashMap<String, Account>,
    /// Initial passwords, kept so tests can check one was set.
    passwords: HashMap<AccountId, SecretString>,
    failing_emails: HashSet<String>,
    create_calls: usize,
}

/// Identity service backed by a map.
#[derive(Default)]
pub struct InMemoryIdentityService {
    state: RwLock<IdentityState>,
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing account.
    pub async fn add_account(&self, email: &str) -> Account {
        let account = Account {
            id: AccountId::new(),
            email: email.to_string(),
        };
        self.state
            .write()
            .await
            .accounts
            .insert(email.to_lowercase(), account.clone());
        account
    }

    /// Make `create_account` fail for an email.
    pub async fn fail_create_for(&self, email: &str) {
        self.state
            .write()
            .await
            .failing_emails
            .insert(email.to_lowercase());
    }

    pub async fn recover(&self, email: &str) {
        self.state
            .write()
            .await
            .failing_emails
            .remove(&email.to_lowercase());
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.state.read().await.accounts.values().cloned().collect()
    }

    pub async fn create_calls(&self) -> usize {
        self.state.read().await.create_calls
    }

    /// True when the account was created here with a non-empty password.
    pub async fn has_initial_password(&self, account_id: &AccountId) -> bool {
        self.state
            .read()
            .await
            .passwords
            .get(account_id)
            .map_or(false, |p| !p.expose_secret().is_empty())
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .get(&email.to_lowercase())
            .cloned())
    }

    async fn create_account(
        &self,
        email: &str,
        temporary_password: &SecretString,
    ) -> Result<Account, DomainError> {
        let mut state = self.state.write().await;
        state.create_calls += 1;
        let key = email.to_lowercase();

        if state.failing_emails.contains(&key) {
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "identity service unavailable",
            ));
        }
        if let Some(existing) = state.accounts.get(&key) {
            return Ok(existing.clone());
        }

        let account = Account {
            id: AccountId::new(),
            email: email.to_string(),
        };
        state.accounts.insert(key, account.clone());
        state
            .passwords
            .insert(account.id, SecretString::new(temporary_password.expose_secret().clone()));
        Ok(account)
    }
}
