//! Temporary credential for newly created owner accounts.

use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

const CREDENTIAL_LEN: usize = 16;

/// One-time password handed to a new account owner.
///
/// `Debug` is redacted; the value is exposed only to the identity service and
/// the lead's notes.
#[derive(Debug, Clone)]
pub struct TemporaryCredential(SecretString);

impl TemporaryCredential {
    /// Generates 16 hex characters from a random v4 UUID.
    pub fn generate() -> Self {
        let mut raw = Uuid::new_v4().simple().to_string();
        raw.truncate(CREDENTIAL_LEN);
        Self(SecretString::new(raw))
    }

    pub fn secret(&self) -> &SecretString {
        &self.0
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}
