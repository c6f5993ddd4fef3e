//! Identity service adapters.

mod http_identity_service;

pub use http_identity_service::HttpIdentityService;
