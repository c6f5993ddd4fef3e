//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum router for the webhook endpoint
//! - `identity` - account-admin API client
//! - `memory` - in-memory storage and identity, used by tests
//! - `mercadopago` - payment provider client and its mock
//! - `postgres` - PostgreSQL repositories

pub mod http;
pub mod identity;
pub mod memory;
pub mod mercadopago;
pub mod postgres;
