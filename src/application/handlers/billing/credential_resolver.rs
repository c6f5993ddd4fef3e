//! CredentialResolver - finds which tenant owner a provider resource belongs to.
//!
//! Notifications carry only a provider resource id. Each enabled owner's
//! credential is tried in turn until one can read the resource. An owner hint
//! (from the notification URL) is probed first; the rest follow in creation
//! order. At most one call is made per enabled owner.

use std::future::Future;
use std::sync::Arc;

use crate::domain::billing::{ProviderCredential, TenantOwner, WebhookError};
use crate::domain::foundation::TenantOwnerId;
use crate::ports::{PaymentError, TenantOwnerRepository};

/// A provider resource together with the owner whose credential fetched it.
#[derive(Debug, Clone)]
pub struct ResolvedResource<T> {
    pub owner: TenantOwner,
    pub resource: T,
}

pub struct CredentialResolver {
    owners: Arc<dyn TenantOwnerRepository>,
}

impl CredentialResolver {
    pub fn new(owners: Arc<dyn TenantOwnerRepository>) -> Self {
        Self { owners }
    }

    /// Probe enabled owners until `fetch` succeeds.
    ///
    /// Returns `Ok(None)` when no owner can read the resource and every
    /// failure was permanent (not found, rejected credential). Returns the
    /// last transient failure as an error so the provider redelivers.
    pub async fn resolve<T, F, Fut>(
        &self,
        resource: &'static str,
        resource_id: &str,
        hint: Option<&TenantOwnerId>,
        fetch: F,
    ) -> Result<Option<ResolvedResource<T>>, WebhookError>
    where
        F: Fn(ProviderCredential) -> Fut,
        Fut: Future<Output = Result<T, PaymentError>>,
    {
        let owners = self.probe_order(hint).await?;
        let mut transient: Option<PaymentError> = None;

        for owner in owners {
            tracing::debug!(
                owner_id = %owner.id,
                resource,
                resource_id,
                "Probing owner credential"
            );

            match fetch(owner.credential.clone()).await {
                Ok(found) => {
                    tracing::info!(
                        owner_id = %owner.id,
                        resource,
                        resource_id,
                        "Resolved owner for provider resource"
                    );
                    return Ok(Some(ResolvedResource {
                        owner,
                        resource: found,
                    }));
                }
                Err(err) if err.retryable => {
                    tracing::warn!(
                        owner_id = %owner.id,
                        resource,
                        resource_id,
                        error = %err,
                        "Transient provider failure while probing owner"
                    );
                    transient = Some(err);
                }
                Err(err) => {
                    tracing::debug!(
                        owner_id = %owner.id,
                        resource,
                        resource_id,
                        error = %err,
                        "Owner credential cannot read resource"
                    );
                }
            }
        }

        match transient {
            Some(err) => Err(err.into()),
            None => {
                tracing::warn!(
                    resource,
                    resource_id,
                    "No enabled owner could read provider resource"
                );
                Ok(None)
            }
        }
    }

    /// Enabled owners, hinted owner first.
    async fn probe_order(
        &self,
        hint: Option<&TenantOwnerId>,
    ) -> Result<Vec<TenantOwner>, WebhookError> {
        let mut owners = self.owners.list_billing_enabled().await?;

        if let Some(hint) = hint {
            match owners.iter().position(|o| &o.id == hint) {
                Some(index) => {
                    let hinted = owners.remove(index);
                    owners.insert(0, hinted);
                }
                None => {
                    tracing::warn!(
                        owner_id = %hint,
                        "Owner hint does not match an enabled owner; probing all"
                    );
                }
            }
        }

        Ok(owners)
    }
}
