//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TENANT_BILLING` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tenant_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod identity;
mod provider;
mod provisioning;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use identity::IdentityConfig;
pub use provider::ProviderConfig;
pub use provisioning::ProvisioningConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment provider configuration (API endpoint, webhook secret)
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Identity service configuration (account provisioning)
    pub identity: IdentityConfig,

    /// Defaults seeded for new tenants
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TENANT_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TENANT_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TENANT_BILLING__DATABASE__URL=...` -> `database.url = ...`
    /// - `TENANT_BILLING__PROVIDER__WEBHOOK_SECRET=...` -> `provider.webhook_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TENANT_BILLING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.provider.validate()?;
        self.identity.validate(&self.server.environment)?;
        self.provisioning.validate()?;
        self.validate_timeouts()
    }

    /// A webhook may wait on several provider and identity calls; the
    /// request deadline has to outlast any single one of them.
    fn validate_timeouts(&self) -> Result<(), ValidationError> {
        let server = self.server.request_timeout_secs;
        for (upstream, upstream_secs) in [
            ("provider", self.provider.request_timeout_secs),
            ("identity", self.identity.request_timeout_secs),
        ] {
            if server <= upstream_secs {
                return Err(ValidationError::RequestTimeoutTooShort {
                    server,
                    upstream,
                    upstream_secs,
                });
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.is_production()
    }
}
