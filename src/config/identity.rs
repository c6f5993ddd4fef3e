//! Identity service configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Identity (account admin) service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity service
    pub base_url: String,

    /// Service key with admin rights
    pub service_key: SecretString,

    /// Timeout for each identity call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl IdentityConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate identity configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("IDENTITY__BASE_URL"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("IDENTITY__BASE_URL"));
        }
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::MustBeHttps("IDENTITY__BASE_URL"));
        }
        if !(1..=60).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout("identity"));
        }
        Ok(())
    }
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> IdentityConfig {
        IdentityConfig {
            base_url: base_url.to_string(),
            service_key: SecretString::new("service-key".to_string()),
            request_timeout_secs: 10,
        }
    }

    #[test]
    fn test_http_allowed_outside_production() {
        assert!(config("http://localhost:9999")
            .validate(&Environment::Development)
            .is_ok());
    }

    #[test]
    fn test_production_requires_https() {
        assert!(matches!(
            config("http://identity.internal").validate(&Environment::Production),
            Err(ValidationError::MustBeHttps(_))
        ));
        assert!(config("https://identity.example.com")
            .validate(&Environment::Production)
            .is_ok());
    }

    #[test]
    fn test_missing_base_url() {
        assert!(matches!(
            config("").validate(&Environment::Development),
            Err(ValidationError::MissingRequired(_))
        ));
    }
}
