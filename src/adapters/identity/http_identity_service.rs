//! HTTP identity service adapter.
//!
//! Talks to an account-admin API authenticated with a service key:
//!
//! - `GET  {base}/admin/users?email=<email>` → `{ "users": [{ "id", "email" }] }`
//! - `POST {base}/admin/users` with `{ "email", "password", "email_confirm": true }`
//!   → `{ "id", "email" }`; `409`/`422` when the email is already registered
//!
//! Creation is made idempotent by falling back to a lookup when the email is
//! already registered.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::{Account, IdentityService};

/// Identity service client over the account-admin REST API.
pub struct HttpIdentityService {
    base_url: String,
    service_key: SecretString,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserListBody {
    #[serde(default)]
    users: Vec<UserBody>,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

impl UserBody {
    fn into_account(self, fallback_email: &str) -> Account {
        Account {
            id: AccountId::from_uuid(self.id),
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

impl HttpIdentityService {
    pub fn new(
        base_url: impl Into<String>,
        service_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| identity_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            http_client,
        })
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self, DomainError> {
        Self::new(
            config.base_url.clone(),
            config.service_key.clone(),
            config.request_timeout(),
        )
    }

    fn users_url(&self) -> String {
        format!("{}/admin/users", self.base_url)
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DomainError> {
        let response = self
            .http_client
            .get(self.users_url())
            .bearer_auth(self.service_key.expose_secret())
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| identity_error(format!("Account lookup failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error("lookup", status, &body));
        }

        let list: UserListBody = response
            .json()
            .await
            .map_err(|e| identity_error(format!("Invalid account lookup response: {}", e)))?;

        Ok(find_by_email(list, email))
    }

    async fn create_account(
        &self,
        email: &str,
        temporary_password: &SecretString,
    ) -> Result<Account, DomainError> {
        let response = self
            .http_client
            .post(self.users_url())
            .bearer_auth(self.service_key.expose_secret())
            .json(&CreateUserBody {
                email,
                password: temporary_password.expose_secret(),
                email_confirm: true,
            })
            .send()
            .await
            .map_err(|e| identity_error(format!("Account creation failed: {}", e)))?;

        let status = response.status();
        if is_already_registered(status) {
            tracing::info!("Account already registered; looking it up");
            return self
                .find_account_by_email(email)
                .await?
                .ok_or_else(|| identity_error("Account reported as registered but not found"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error("creation", status, &body));
        }

        let user: UserBody = response
            .json()
            .await
            .map_err(|e| identity_error(format!("Invalid account creation response: {}", e)))?;

        Ok(user.into_account(email))
    }
}

fn identity_error(message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::ExternalServiceError, message)
}

fn is_already_registered(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    )
}

fn map_status_error(operation: &str, status: StatusCode, body: &str) -> DomainError {
    let body = body.trim();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.chars().take(200).collect::<String>())
    };
    identity_error(format!("Account {} rejected: {}", operation, detail))
        .with_detail("status", status.as_u16().to_string())
}

/// The admin API may match loosely; only an exact (case-insensitive) email counts.
fn find_by_email(list: UserListBody, email: &str) -> Option<Account> {
    list.users
        .into_iter()
        .find(|u| {
            u.email
                .as_deref()
                .map_or(false, |e| e.trim().eq_ignore_ascii_case(email.trim()))
        })
        .map(|u| u.into_account(email))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(json: &str) -> UserListBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn new_trims_trailing_slash() {
        let service = HttpIdentityService::new(
            "https://auth.example.com/",
            SecretString::new("key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(service.users_url(), "https://auth.example.com/admin/users");
    }

    #[test]
    fn lookup_matches_email_case_insensitively() {
        let id = Uuid::new_v4();
        let body = list(&format!(
            r#"{{"users":[{{"id":"{}","email":"Ana@Acme.com"}}]}}"#,
            id
        ));

        let account = find_by_email(body, "ana@acme.com").unwrap();

        assert_eq!(account.id, AccountId::from_uuid(id));
    }

    #[test]
    fn lookup_ignores_partial_matches() {
        let body = list(&format!(
            r#"{{"users":[{{"id":"{}","email":"ana@acme.com.br"}}]}}"#,
            Uuid::new_v4()
        ));

        assert!(find_by_email(body, "ana@acme.com").is_none());
    }

    #[test]
    fn empty_listing_finds_nothing() {
        assert!(find_by_email(list("{}"), "a@x.com").is_none());
    }

    #[test]
    fn conflict_statuses_mean_already_registered() {
        assert!(is_already_registered(StatusCode::CONFLICT));
        assert!(is_already_registered(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(!is_already_registered(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn status_errors_are_external_service_errors() {
        let err = map_status_error("creation", StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
        assert!(err.message().contains("boom"));
    }

    #[test]
    fn create_body_confirms_email() {
        let body = serde_json::to_value(CreateUserBody {
            email: "a@x.com",
            password: "secret",
            email_confirm: true,
        })
        .unwrap();
        assert_eq!(body["email_confirm"], true);
    }
}
