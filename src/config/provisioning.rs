//! Tenant provisioning defaults

use chrono::NaiveTime;
use serde::Deserialize;

use crate::domain::provisioning::ScheduleDefaults;

use super::error::ValidationError;

/// Defaults applied when a lead converts into a tenant
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    /// Opening time seeded for every weekday (HH:MM)
    #[serde(default = "default_open_time")]
    pub default_open_time: String,

    /// Closing time seeded for every weekday (HH:MM)
    #[serde(default = "default_close_time")]
    pub default_close_time: String,

    /// Currency label used in human-readable lead notes
    #[serde(default = "default_currency_label")]
    pub currency_label: String,
}

impl ProvisioningConfig {
    /// Parsed schedule defaults
    pub fn schedule_defaults(&self) -> Result<ScheduleDefaults, ValidationError> {
        let opens_at = parse_time(&self.default_open_time, "PROVISIONING__DEFAULT_OPEN_TIME")?;
        let closes_at = parse_time(&self.default_close_time, "PROVISIONING__DEFAULT_CLOSE_TIME")?;
        if opens_at >= closes_at {
            return Err(ValidationError::InvalidOpeningHours);
        }
        Ok(ScheduleDefaults {
            opens_at,
            closes_at,
        })
    }

    /// Validate provisioning configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.schedule_defaults()?;
        Ok(())
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            default_open_time: default_open_time(),
            default_close_time: default_close_time(),
            currency_label: default_currency_label(),
        }
    }
}

fn parse_time(value: &str, field: &'static str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTimeOfDay(field))
}

fn default_open_time() -> String {
    "11:00".to_string()
}

fn default_close_time() -> String {
    "23:00".to_string()
}

fn default_currency_label() -> String {
    "R$".to_string()
}
