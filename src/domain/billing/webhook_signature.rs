//! Webhook signature verification.
//!
//! The provider signs each notification with HMAC-SHA256 over the manifest
//! `id:<data.id>;request-id:<x-request-id>;ts:<ts>;` and sends the result in
//! the `x-signature` header as `ts=<ts>,v1=<hex>`. Parts of the manifest whose
//! value is absent are omitted.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Timestamps above this are milliseconds rather than seconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Parsed components of the `x-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Raw `ts` value, used verbatim in the manifest.
    pub ts: String,
    /// Decoded `v1` HMAC.
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses `ts=<ts>,v1=<hex>`; unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut ts: Option<String> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| WebhookError::SignatureFormat("invalid header format".to_string()))?;

            match key.trim() {
                "ts" => ts = Some(value.trim().to_string()),
                "v1" => {
                    v1_signature = Some(hex_decode(value.trim()).ok_or_else(|| {
                        WebhookError::SignatureFormat("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        Ok(Self {
            ts: ts.ok_or_else(|| WebhookError::SignatureFormat("missing ts".to_string()))?,
            v1_signature: v1_signature
                .ok_or_else(|| WebhookError::SignatureFormat("missing v1 signature".to_string()))?,
        })
    }

    /// Signature time in Unix seconds, accepting either seconds or milliseconds.
    fn unix_secs(&self) -> Option<i64> {
        let raw: i64 = self.ts.parse().ok()?;
        Some(if raw > MILLIS_THRESHOLD { raw / 1000 } else { raw })
    }
}

/// Verifier for provider webhook signatures.
pub struct WebhookSignatureVerifier {
    secret: SecretString,
    /// Maximum signature age in seconds; `0` disables the age check.
    tolerance_secs: i64,
}

impl WebhookSignatureVerifier {
    pub fn new(secret: SecretString, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    /// Verifies a notification's signature.
    ///
    /// # Errors
    ///
    /// - `SignatureFormat` - header missing or unparsable
    /// - `InvalidSignature` - HMAC mismatch or signature outside the tolerance window
    pub fn verify(
        &self,
        signature_header: Option<&str>,
        request_id: Option<&str>,
        data_id: Option<&str>,
        now_unix: i64,
    ) -> Result<(), WebhookError> {
        let header = signature_header
            .ok_or_else(|| WebhookError::SignatureFormat("missing x-signature header".to_string()))?;
        let header = SignatureHeader::parse(header)?;

        if self.tolerance_secs > 0 {
            let signed_at = header.unix_secs().ok_or(WebhookError::InvalidSignature)?;
            if (now_unix - signed_at).abs() > self.tolerance_secs {
                tracing::warn!(
                    signed_at,
                    now = now_unix,
                    "Webhook signature outside tolerance window"
                );
                return Err(WebhookError::InvalidSignature);
            }
        }

        let expected = self.compute_signature(&manifest(data_id, request_id, &header.ts));

        if expected.as_slice().ct_eq(&header.v1_signature).unwrap_u8() != 1 {
            tracing::warn!("Invalid webhook signature");
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    fn compute_signature(&self, manifest: &str) -> Vec<u8> {
        // HMAC-SHA256 accepts keys of any length, so this cannot fail.
        let mut mac = match HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(manifest.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Builds the signed manifest. Alphanumeric ids are lower-cased by the provider.
pub fn manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id {
        manifest.push_str(&format!("id:{};", id.to_ascii_lowercase()));
    }
    if let Some(request_id) = request_id {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        bytes.push(u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()?);
    }
    Some(bytes)
}

/// Encode bytes to hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
