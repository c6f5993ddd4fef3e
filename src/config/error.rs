//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout for {0}")]
    InvalidTimeout(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 100, got {0}")]
    InvalidPoolSize(u32),

    #[error("Invalid URL for {0}: must be http(s)")]
    InvalidUrl(&'static str),

    #[error("{0} must use HTTPS in production")]
    MustBeHttps(&'static str),

    #[error("Invalid time of day for {0}: expected HH:MM")]
    InvalidTimeOfDay(&'static str),

    #[error("Opening time must be before closing time")]
    InvalidOpeningHours,

    #[error("Server request timeout ({server}s) must exceed the {upstream} timeout ({upstream_secs}s)")]
    RequestTimeoutTooShort {
        server: u64,
        upstream: &'static str,
        upstream_secs: u64,
    },
}
