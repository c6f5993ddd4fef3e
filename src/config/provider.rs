//! Payment provider configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment provider configuration (Mercado Pago)
///
/// Per-owner access tokens live in the database, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for each provider call, in seconds (1..=60)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Webhook signing secret; when unset, signatures are not checked
    pub webhook_secret: Option<SecretString>,

    /// Maximum signature age in seconds; 0 disables the age check
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl ProviderConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if webhook signatures are verified
    pub fn verifies_signatures(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://")
        {
            return Err(ValidationError::InvalidUrl("PROVIDER__API_BASE_URL"));
        }
        if !(1..=60).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout("provider"));
        }
        if self.signature_tolerance_secs < 0 {
            return Err(ValidationError::InvalidTimeout("provider signature tolerance"));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            webhook_secret: None,
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_signature_tolerance() -> i64 {
    300
}
