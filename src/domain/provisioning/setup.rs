//! Records seeded alongside a new tenant.

use crate::domain::foundation::{AccountId, TenantId};

/// Storefront configuration, one per tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantConfig {
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: Option<String>,
    pub is_open: bool,
}

impl TenantConfig {
    pub fn seed(tenant_id: TenantId, name: &str, phone: Option<&str>) -> Self {
        Self {
            tenant_id,
            name: name.to_string(),
            phone: phone.map(str::to_string),
            is_open: true,
        }
    }
}

/// Links an identity account to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerBinding {
    pub account_id: AccountId,
    pub tenant_id: TenantId,
    pub is_owner: bool,
}

impl OwnerBinding {
    pub fn owner(account_id: AccountId, tenant_id: TenantId) -> Self {
        Self {
            account_id,
            tenant_id,
            is_owner: true,
        }
    }
}
