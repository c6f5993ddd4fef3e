//! Mercado Pago adapter.
//!
//! Provides:
//! - `MercadoPagoAdapter` - REST client implementing `PaymentProvider`
//! - `MockPaymentProvider` - scriptable provider for tests

mod mercadopago_adapter;
mod mock_payment_provider;
mod wire_types;

pub use mercadopago_adapter::MercadoPagoAdapter;
pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
