//! HTTP adapter for provider billing notifications.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAckResponse, WebhookQuery};
pub use handlers::BillingAppState;
pub use routes::billing_router;
