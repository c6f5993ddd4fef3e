//! Provisioning stage state machine.
//!
//! Persisted on the lead so a redelivered payment resumes provisioning from the
//! last step that completed instead of starting over.

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// How far tenant provisioning for a lead has progressed.
///
/// Variants are declared in execution order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProvisioningStage {
    #[default]
    Pending,
    TenantCreated,
    ConfigSeeded,
    AccountCreated,
    Bound,
    Done,
}

impl ProvisioningStage {
    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<Self> {
        self.successors().first().copied()
    }

    /// True once the stage has reached or passed `other`.
    pub fn has_reached(&self, other: ProvisioningStage) -> bool {
        *self >= other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStage::Pending => "pending",
            ProvisioningStage::TenantCreated => "tenant_created",
            ProvisioningStage::ConfigSeeded => "config_seeded",
            ProvisioningStage::AccountCreated => "account_created",
            ProvisioningStage::Bound => "bound",
            ProvisioningStage::Done => "done",
        }
    }
}

impl StateMachine for ProvisioningStage {
    fn successors(&self) -> &'static [Self] {
        match self {
            ProvisioningStage::Pending => &[ProvisioningStage::TenantCreated],
            ProvisioningStage::TenantCreated => &[ProvisioningStage::ConfigSeeded],
            ProvisioningStage::ConfigSeeded => &[ProvisioningStage::AccountCreated],
            ProvisioningStage::AccountCreated => &[ProvisioningStage::Bound],
            ProvisioningStage::Bound => &[ProvisioningStage::Done],
            ProvisioningStage::Done => &[],
        }
    }
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisioningStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProvisioningStage::Pending),
            "tenant_created" => Ok(ProvisioningStage::TenantCreated),
            "config_seeded" => Ok(ProvisioningStage::ConfigSeeded),
            "account_created" => Ok(ProvisioningStage::AccountCreated),
            "bound" => Ok(ProvisioningStage::Bound),
            "done" => Ok(ProvisioningStage::Done),
            other => Err(ValidationError::invalid_format(
                "provisioning_stage",
                format!("unknown stage '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_one_step_at_a_time() {
        let mut stage = ProvisioningStage::Pending;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            stage = stage.transition_to(next).unwrap();
            visited.push(stage);
        }

        assert_eq!(
            visited,
            vec![
                ProvisioningStage::Pending,
                ProvisioningStage::TenantCreated,
                ProvisioningStage::ConfigSeeded,
                ProvisioningStage::AccountCreated,
                ProvisioningStage::Bound,
                ProvisioningStage::Done,
            ]
        );
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let result = ProvisioningStage::Pending.transition_to(ProvisioningStage::Bound);
        assert!(result.is_err());
    }

    #[test]
    fn done_is_terminal() {
        assert!(ProvisioningStage::Done.is_terminal());
        assert!(!ProvisioningStage::Bound.is_terminal());
    }

    #[test]
    fn has_reached_follows_execution_order() {
        assert!(ProvisioningStage::Bound.has_reached(ProvisioningStage::ConfigSeeded));
        assert!(ProvisioningStage::Bound.has_reached(ProvisioningStage::Bound));
        assert!(!ProvisioningStage::TenantCreated.has_reached(ProvisioningStage::Done));
    }

    #[test]
    fn parses_every_stage_name() {
        let mut stage = ProvisioningStage::Pending;
        loop {
            assert_eq!(stage.as_str().parse::<ProvisioningStage>().unwrap(), stage);
            match stage.next() {
                Some(next) => stage = next,
                None => break,
            }
        }
        assert!("halfway".parse::<ProvisioningStage>().is_err());
    }
}
