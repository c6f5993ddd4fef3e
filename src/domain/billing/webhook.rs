//! Webhook envelope parsing.
//!
//! Provider notifications are `{ "type": ..., "data": { "id": ... } }`. Parsing
//! is lenient: anything that does not yield both a type and an id becomes a
//! [`MalformedEnvelope`] which the ingress acknowledges without side effects.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Event types the reconciler dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    SubscriptionPreapproval,
    Payment,
    MerchantOrder,
    /// Forward-compatible catch-all; acknowledged and ignored.
    Other(String),
}

impl BillingEventKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "subscription_preapproval" | "preapproval" => BillingEventKind::SubscriptionPreapproval,
            "payment" => BillingEventKind::Payment,
            "merchant_order" | "topic_merchant_order_wh" => BillingEventKind::MerchantOrder,
            other => BillingEventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BillingEventKind::SubscriptionPreapproval => "subscription_preapproval",
            BillingEventKind::Payment => "payment",
            BillingEventKind::MerchantOrder => "merchant_order",
            BillingEventKind::Other(raw) => raw,
        }
    }
}

impl fmt::Display for BillingEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A well-formed notification: what changed and which provider resource to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    pub kind: BillingEventKind,
    pub resource_id: String,
}

/// Why an envelope was not dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedEnvelope {
    InvalidJson,
    MissingType,
    MissingDataId,
}

impl fmt::Display for MalformedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MalformedEnvelope::InvalidJson => "body is not valid JSON",
            MalformedEnvelope::MissingType => "missing event type",
            MalformedEnvelope::MissingDataId => "missing data.id",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    event_type: Option<Value>,
    topic: Option<Value>,
    data: Option<RawData>,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    id: Option<Value>,
}

/// Loosely-typed envelope collected from the body and query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookEnvelope {
    pub event_type: Option<String>,
    pub data_id: Option<String>,
    invalid_json: bool,
}

impl WebhookEnvelope {
    /// Parses a request body. An empty body is an empty envelope, not invalid JSON.
    pub fn from_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }

        match serde_json::from_slice::<RawEnvelope>(body) {
            Ok(raw) => Self {
                event_type: raw
                    .event_type
                    .as_ref()
                    .and_then(scalar_to_string)
                    .or_else(|| raw.topic.as_ref().and_then(scalar_to_string)),
                data_id: raw.data.and_then(|d| d.id).as_ref().and_then(scalar_to_string),
                invalid_json: false,
            },
            Err(_) => Self {
                invalid_json: true,
                ..Self::default()
            },
        }
    }

    /// Fills missing fields from legacy query parameters (`topic`/`type`, `id`/`data.id`).
    pub fn with_query_fallback(mut self, event_type: Option<&str>, data_id: Option<&str>) -> Self {
        if self.event_type.is_none() {
            self.event_type = event_type.and_then(non_blank);
        }
        if self.data_id.is_none() {
            self.data_id = data_id.and_then(non_blank);
        }
        self
    }

    /// Validates the envelope shape.
    pub fn into_event(self) -> Result<BillingEvent, MalformedEnvelope> {
        let event_type = match self.event_type {
            Some(t) => t,
            None if self.invalid_json && self.data_id.is_none() => {
                return Err(MalformedEnvelope::InvalidJson)
            }
            None => return Err(MalformedEnvelope::MissingType),
        };
        let resource_id = self.data_id.ok_or(MalformedEnvelope::MissingDataId)?;

        Ok(BillingEvent {
            kind: BillingEventKind::parse(&event_type),
            resource_id,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
