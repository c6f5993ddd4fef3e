//! Mock payment provider for testing.
//!
//! Resources are registered per access token, so a resource is only visible to
//! the owner that "owns" it on the provider side, which is what credential
//! probing relies on. Supports:
//! - Per-owner resources
//! - Per-owner error injection
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::ProviderCredential;
use crate::ports::{
    PaymentError, PaymentProvider, ProviderMerchantOrder, ProviderPayment, ProviderSubscription,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Make a payment visible to one owner
/// mock.add_payment("owner-token", payment);
///
/// // Inject errors for another
/// mock.set_owner_error("other-token", PaymentError::timeout("slow"));
///
/// // Assert on probing
/// assert_eq!(mock.call_count("fetch_payment"), 2);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<(String, String), ProviderSubscription>,
    payments: HashMap<(String, String), ProviderPayment>,
    merchant_orders: HashMap<(String, String), ProviderMerchantOrder>,

    /// Errors returned for every call made with a token.
    owner_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub access_token: String,
    pub resource_id: String,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_subscription(&self, access_token: &str, subscription: ProviderSubscription) {
        let key = (access_token.to_string(), subscription.id.clone());
        self.state().subscriptions.insert(key, subscription);
    }

    pub fn add_payment(&self, access_token: &str, payment: ProviderPayment) {
        let key = (access_token.to_string(), payment.id.clone());
        self.state().payments.insert(key, payment);
    }

    pub fn add_merchant_order(&self, access_token: &str, order: ProviderMerchantOrder) {
        let key = (access_token.to_string(), order.id.clone());
        self.state().merchant_orders.insert(key, order);
    }

    /// Fail every call made with `access_token`.
    pub fn set_owner_error(&self, access_token: &str, error: PaymentError) {
        self.state()
            .owner_errors
            .insert(access_token.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().owner_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().call_log.len()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    fn record_call(&self, method: &str, credential: &ProviderCredential, resource_id: &str) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            access_token: credential.bearer_token().to_string(),
            resource_id: resource_id.to_string(),
        });
    }

    fn check_error(&self, credential: &ProviderCredential) -> Result<(), PaymentError> {
        match self.state().owner_errors.get(credential.bearer_token()) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn fetch_subscription(
        &self,
        credential: &ProviderCredential,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError> {
        self.record_call("fetch_subscription", credential, subscription_id);
        self.check_error(credential)?;

        let key = (credential.bearer_token().to_string(), subscription_id.to_string());
        self.state()
            .subscriptions
            .get(&key)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("subscription"))
    }

    async fn fetch_payment(
        &self,
        credential: &ProviderCredential,
        payment_id: &str,
    ) -> Result<ProviderPayment, PaymentError> {
        self.record_call("fetch_payment", credential, payment_id);
        self.check_error(credential)?;

        let key = (credential.bearer_token().to_string(), payment_id.to_string());
        self.state()
            .payments
            .get(&key)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("payment"))
    }

    async fn fetch_merchant_order(
        &self,
        credential: &ProviderCredential,
        order_id: &str,
    ) -> Result<ProviderMerchantOrder, PaymentError> {
        self.record_call("fetch_merchant_order", credential, order_id);
        self.check_error(credential)?;

        let key = (credential.bearer_token().to_string(), order_id.to_string());
        self.state()
            .merchant_orders
            .get(&key)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("merchant order"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PaymentErrorCode;

    fn payment(id: &str) -> ProviderPayment {
        ProviderPayment {
            id: id.to_string(),
            status: "approved".to_string(),
            status_detail: None,
            external_reference: None,
            transaction_amount: 10.0,
            payment_method_id: None,
            payment_type_id: None,
            date_created: None,
            date_approved: None,
            payer_email: None,
        }
    }

    #[tokio::test]
    async fn resources_are_visible_only_to_their_owner() {
        let mock = MockPaymentProvider::new();
        mock.add_payment("token-a", payment("1"));

        let own = mock.fetch_payment(&ProviderCredential::new("token-a"), "1").await;
        let other = mock.fetch_payment(&ProviderCredential::new("token-b"), "1").await;

        assert!(own.is_ok());
        assert_eq!(other.unwrap_err().code, PaymentErrorCode::NotFound);
    }

    #[tokio::test]
    async fn owner_errors_take_precedence() {
        let mock = MockPaymentProvider::new();
        mock.add_payment("token-a", payment("1"));
        mock.set_owner_error("token-a", PaymentError::timeout("slow"));

        let err = mock
            .fetch_payment(&ProviderCredential::new("token-a"), "1")
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::Timeout);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let mock = MockPaymentProvider::new();
        let _ = mock
            .fetch_subscription(&ProviderCredential::new("token-a"), "sub-1")
            .await;

        assert_eq!(mock.call_count("fetch_subscription"), 1);
        assert_eq!(mock.calls()[0].access_token, "token-a");
        assert_eq!(mock.calls()[0].resource_id, "sub-1");
    }
}
