//! TenantOwner (reseller) entity and its provider credential.

use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{TenantOwnerId, Timestamp};

/// Bearer credential used to call the payment provider on an owner's behalf.
///
/// The token is never printed; `Debug` is redacted by `secrecy`.
#[derive(Debug, Clone)]
pub struct ProviderCredential(SecretString);

impl ProviderCredential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self(SecretString::new(access_token.into()))
    }

    /// Exposes the raw token for building an `Authorization` header.
    pub fn bearer_token(&self) -> &str {
        self.0.expose_secret()
    }
}

/// A reseller that owns tenants and holds one payment-provider credential.
#[derive(Debug, Clone)]
pub struct TenantOwner {
    pub id: TenantOwnerId,
    pub name: String,
    pub credential: ProviderCredential,
    /// Whether this owner's credential takes part in webhook reconciliation.
    pub billing_enabled: bool,
    pub created_at: Timestamp,
}

impl TenantOwner {
    pub fn new(name: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            id: TenantOwnerId::new(),
            name: name.into(),
            credential: ProviderCredential::new(access_token),
            billing_enabled: true,
            created_at: Timestamp::now(),
        }
    }

    /// Builder-style toggle used by fixtures and admin tooling.
    pub fn with_billing_enabled(mut self, enabled: bool) -> Self {
        self.billing_enabled = enabled;
        self
    }
}
