//! External reference embedded in provider-side objects.
//!
//! Formats:
//! - `lead_<lead uuid>` - payment for a prospective tenant
//! - `<tenant uuid>` - payment for an existing tenant
//! - either of the above prefixed with `owner_<owner uuid>:`

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{LeadId, TenantId, TenantOwnerId, ValidationError};

const LEAD_PREFIX: &str = "lead_";
const OWNER_PREFIX: &str = "owner_";

/// What a provider object refers to on our side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTarget {
    Lead(LeadId),
    Tenant(TenantId),
}

/// Parsed external reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalReference {
    pub owner: Option<TenantOwnerId>,
    pub target: ReferenceTarget,
}

impl ExternalReference {
    pub fn lead(lead_id: LeadId) -> Self {
        Self {
            owner: None,
            target: ReferenceTarget::Lead(lead_id),
        }
    }

    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            owner: None,
            target: ReferenceTarget::Tenant(tenant_id),
        }
    }

    pub fn with_owner(mut self, owner: TenantOwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn is_lead(&self) -> bool {
        matches!(self.target, ReferenceTarget::Lead(_))
    }

    /// True when the reference names an owner different from `owner`.
    pub fn conflicts_with_owner(&self, owner: &TenantOwnerId) -> bool {
        self.owner.map_or(false, |named| &named != owner)
    }
}

/// Cheap check used to filter merchant orders before any provider call.
pub fn looks_like_lead_reference(raw: &str) -> bool {
    matches!(
        raw.parse::<ExternalReference>(),
        Ok(ExternalReference {
            target: ReferenceTarget::Lead(_),
            ..
        })
    )
}

impl FromStr for ExternalReference {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::empty_field("external_reference"));
        }

        let (owner, rest) = match raw.strip_prefix(OWNER_PREFIX) {
            Some(tail) => {
                let (owner, rest) = tail.split_once(':').ok_or_else(|| {
                    ValidationError::invalid_format("external_reference", "owner prefix without target")
                })?;
                let owner = owner.parse::<TenantOwnerId>().map_err(|_| {
                    ValidationError::invalid_format("external_reference", "owner id is not a UUID")
                })?;
                (Some(owner), rest)
            }
            None => (None, raw),
        };

        let target = match rest.strip_prefix(LEAD_PREFIX) {
            Some(lead) => ReferenceTarget::Lead(lead.parse().map_err(|_| {
                ValidationError::invalid_format("external_reference", "lead id is not a UUID")
            })?),
            None => ReferenceTarget::Tenant(rest.parse().map_err(|_| {
                ValidationError::invalid_format("external_reference", "tenant id is not a UUID")
            })?),
        };

        Ok(Self { owner, target })
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "{}{}:", OWNER_PREFIX, owner)?;
        }
        match &self.target {
            ReferenceTarget::Lead(id) => write!(f, "{}{}", LEAD_PREFIX, id),
            ReferenceTarget::Tenant(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lead_reference() {
        let lead = LeadId::new();
        let parsed: ExternalReference = format!("lead_{}", lead).parse().unwrap();
        assert_eq!(parsed, ExternalReference::lead(lead));
        assert!(parsed.is_lead());
    }

    #[test]
    fn parses_bare_tenant_reference() {
        let tenant = TenantId::new();
        let parsed: ExternalReference = tenant.to_string().parse().unwrap();
        assert_eq!(parsed.target, ReferenceTarget::Tenant(tenant));
        assert!(parsed.owner.is_none());
    }

    #[test]
    fn parses_owner_prefixed_reference() {
        let owner = TenantOwnerId::new();
        let lead = LeadId::new();
        let raw = format!("owner_{}:lead_{}", owner, lead);

        let parsed: ExternalReference = raw.parse().unwrap();

        assert_eq!(parsed.owner, Some(owner));
        assert_eq!(parsed.target, ReferenceTarget::Lead(lead));
        assert_eq!(parsed.to_string(), raw);
    }

    #[test]
    fn rejects_malformed_references() {
        assert!("".parse::<ExternalReference>().is_err());
        assert!("lead_".parse::<ExternalReference>().is_err());
        assert!("lead_abc".parse::<ExternalReference>().is_err());
        assert!("order-42".parse::<ExternalReference>().is_err());
        assert!("owner_xyz:lead_abc".parse::<ExternalReference>().is_err());
        assert!(format!("owner_{}", TenantOwnerId::new())
            .parse::<ExternalReference>()
            .is_err());
    }

    #[test]
    fn owner_conflict_detection() {
        let owner = TenantOwnerId::new();
        let other = TenantOwnerId::new();
        let reference = ExternalReference::tenant(TenantId::new()).with_owner(owner);

        assert!(!reference.conflicts_with_owner(&owner));
        assert!(reference.conflicts_with_owner(&other));
        assert!(!ExternalReference::tenant(TenantId::new()).conflicts_with_owner(&other));
    }

    #[test]
    fn lead_reference_filter() {
        assert!(looks_like_lead_reference(&format!("lead_{}", LeadId::new())));
        assert!(!looks_like_lead_reference(&TenantId::new().to_string()));
        assert!(!looks_like_lead_reference("checkout-123"));
    }
}
