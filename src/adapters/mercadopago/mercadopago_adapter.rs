//! Mercado Pago payment provider adapter.
//!
//! Implements the `PaymentProvider` port over the provider's REST API. Every
//! request carries the calling owner's access token as a bearer credential
//! and is bounded by the configured timeout.
//!
//! # Error mapping
//!
//! | Response            | `PaymentErrorCode`     |
//! |---------------------|------------------------|
//! | 404                 | `NotFound`             |
//! | 401, 403            | `AuthenticationError`  |
//! | 429                 | `RateLimitExceeded`    |
//! | other non-2xx       | `ProviderError`        |
//! | request timed out   | `Timeout`              |
//! | other transport err | `NetworkError`         |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::ProviderConfig;
use crate::domain::billing::ProviderCredential;
use crate::ports::{
    PaymentError, PaymentProvider, ProviderMerchantOrder, ProviderPayment, ProviderSubscription,
};

use super::wire_types::{MpErrorBody, MpMerchantOrder, MpPayment, MpPreapproval};

/// Payment provider adapter for the Mercado Pago REST API.
pub struct MercadoPagoAdapter {
    api_base_url: String,
    http_client: reqwest::Client,
}

impl MercadoPagoAdapter {
    /// Create an adapter with an explicit base URL and timeout.
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create an adapter from the provider configuration section.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, PaymentError> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    async fn get<W, T>(
        &self,
        credential: &ProviderCredential,
        path: &str,
        resource: &str,
    ) -> Result<T, PaymentError>
    where
        W: DeserializeOwned + Into<T>,
    {
        let url = format!("{}{}", self.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(credential.bearer_token())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, resource, &body));
        }

        let wire: W = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse {} response: {}", resource, e))
        })?;
        Ok(wire.into())
    }
}

#[async_trait]
impl PaymentProvider for MercadoPagoAdapter {
    async fn fetch_subscription(
        &self,
        credential: &ProviderCredential,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError> {
        self.get::<MpPreapproval, _>(
            credential,
            &format!("/preapproval/{}", subscription_id),
            "subscription",
        )
        .await
    }

    async fn fetch_payment(
        &self,
        credential: &ProviderCredential,
        payment_id: &str,
    ) -> Result<ProviderPayment, PaymentError> {
        self.get::<MpPayment, _>(credential, &format!("/v1/payments/{}", payment_id), "payment")
            .await
    }

    async fn fetch_merchant_order(
        &self,
        credential: &ProviderCredential,
        order_id: &str,
    ) -> Result<ProviderMerchantOrder, PaymentError> {
        self.get::<MpMerchantOrder, _>(
            credential,
            &format!("/merchant_orders/{}", order_id),
            "merchant order",
        )
        .await
    }
}

fn map_transport_error(err: reqwest::Error) -> PaymentError {
    if err.is_timeout() {
        PaymentError::timeout(err.to_string())
    } else {
        PaymentError::network(err.to_string())
    }
}

/// Maps a non-2xx response to a payment error.
pub(crate) fn map_status_error(status: StatusCode, resource: &str, body: &str) -> PaymentError {
    let parsed: MpErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed
        .message
        .clone()
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    let err = match status {
        StatusCode::NOT_FOUND => PaymentError::not_found(resource),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PaymentError::authentication(format!("Credential rejected: {}", detail))
        }
        StatusCode::TOO_MANY_REQUESTS => PaymentError::rate_limited(detail),
        _ => PaymentError::provider(format!("Provider API error: {}", detail)),
    };

    match parsed.error {
        Some(code) => err.with_provider_code(code),
        None => err,
    }
}
