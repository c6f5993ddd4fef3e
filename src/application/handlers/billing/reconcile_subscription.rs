//! ReconcileSubscriptionHandler - aligns a tenant with its provider subscription.
//!
//! The provider's current state is authoritative: every notification triggers
//! a fresh fetch and the tenant is overwritten with the mapped status. Event
//! ordering therefore does not matter.

use std::sync::Arc;

use crate::domain::billing::{SubscriptionStatus, SubscriptionSync, WebhookError};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::{PaymentProvider, TenantOwnerRepository, TenantRepository};

/// Result of reconciling one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// Tenant status overwritten from the provider.
    Updated {
        tenant_id: TenantId,
        status: SubscriptionStatus,
    },
    /// No tenant is linked to this subscription id.
    TenantNotFound,
    /// The tenant's owner is missing or has billing disabled.
    OwnerUnavailable,
    /// The provider does not know the subscription under the owner's credential.
    SubscriptionNotFound,
}

impl SubscriptionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionOutcome::Updated { .. } => "tenant_updated",
            SubscriptionOutcome::TenantNotFound => "tenant_not_found",
            SubscriptionOutcome::OwnerUnavailable => "owner_unavailable",
            SubscriptionOutcome::SubscriptionNotFound => "subscription_not_found",
        }
    }
}

pub struct ReconcileSubscriptionHandler {
    tenants: Arc<dyn TenantRepository>,
    owners: Arc<dyn TenantOwnerRepository>,
    provider: Arc<dyn PaymentProvider>,
}

impl ReconcileSubscriptionHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        owners: Arc<dyn TenantOwnerRepository>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            tenants,
            owners,
            provider,
        }
    }

    pub async fn handle(&self, subscription_id: &str) -> Result<SubscriptionOutcome, WebhookError> {
        // 1. Find the tenant linked to this subscription
        let Some(tenant) = self
            .tenants
            .find_by_provider_subscription_id(subscription_id)
            .await?
        else {
            tracing::info!(
                subscription_id,
                "No tenant linked to subscription; ignoring"
            );
            return Ok(SubscriptionOutcome::TenantNotFound);
        };

        // 2. Use the tenant owner's credential
        let owner = match self.owners.find_by_id(&tenant.owner_id).await? {
            Some(owner) if owner.billing_enabled => owner,
            _ => {
                tracing::warn!(
                    tenant_id = %tenant.id,
                    owner_id = %tenant.owner_id,
                    subscription_id,
                    "Tenant owner missing or billing disabled; ignoring"
                );
                return Ok(SubscriptionOutcome::OwnerUnavailable);
            }
        };

        // 3. Fetch current state; failures abort before any write
        let subscription = match self
            .provider
            .fetch_subscription(&owner.credential, subscription_id)
            .await
        {
            Ok(subscription) => subscription,
            Err(err) if err.is_not_found() => {
                tracing::warn!(
                    tenant_id = %tenant.id,
                    owner_id = %owner.id,
                    subscription_id,
                    "Subscription not found at provider; ignoring"
                );
                return Ok(SubscriptionOutcome::SubscriptionNotFound);
            }
            Err(err) => {
                tracing::error!(
                    tenant_id = %tenant.id,
                    owner_id = %owner.id,
                    subscription_id,
                    error = %err,
                    "Failed to fetch subscription"
                );
                return Err(err.into());
            }
        };

        // 4. Overwrite tenant status with the mapped provider state
        let sync = SubscriptionSync::from_provider_state(&subscription.status);
        self.tenants
            .apply_subscription_sync(&tenant.id, &sync, Timestamp::now())
            .await?;

        tracing::info!(
            tenant_id = %tenant.id,
            owner_id = %owner.id,
            subscription_id,
            provider_state = %subscription.status,
            status = %sync.status,
            is_active = sync.is_active,
            "Tenant subscription reconciled"
        );

        Ok(SubscriptionOutcome::Updated {
            tenant_id: tenant.id,
            status: sync.status,
        })
    }
}
