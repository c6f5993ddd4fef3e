//! HTTP DTOs for the billing webhook endpoint.

use serde::{Deserialize, Serialize};

use crate::application::WebhookOutcome;

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Query parameters accepted on the webhook route.
///
/// `topic`/`type` and `id`/`data.id` are the legacy IPN-style parameters; they
/// are only used when the body does not carry the same fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "data.id")]
    pub data_id: Option<String>,
}

impl WebhookQuery {
    pub fn topic(&self) -> Option<String> {
        self.event_type.clone().or_else(|| self.topic.clone())
    }

    pub fn resource_id(&self) -> Option<String> {
        self.data_id.clone().or_else(|| self.id.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Acknowledgement for an accepted notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookAckResponse {
    Processed { outcome: String },
    Ignored { reason: String },
}

impl From<&WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Ignored { reason } => WebhookAckResponse::Ignored {
                reason: reason.clone(),
            },
            other => WebhookAckResponse::Processed {
                outcome: other.label().to_string(),
            },
        }
    }
}

/// Error body; the provider only looks at the status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn invalid_signature() -> Self {
        Self {
            error: "invalid signature".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_outcome_serializes_with_reason() {
        let ack = WebhookAckResponse::from(&WebhookOutcome::Ignored {
            reason: "missing data.id".to_string(),
        });

        let json = serde_json::to_value(&ack).unwrap();

        assert_eq!(json["status"], "ignored");
        assert_eq!(json["reason"], "missing data.id");
    }

    #[test]
    fn processed_ack_carries_outcome_label() {
        let json = serde_json::to_value(WebhookAckResponse::Processed {
            outcome: "tenant_updated".to_string(),
        })
        .unwrap();

        assert_eq!(json["status"], "processed");
        assert_eq!(json["outcome"], "tenant_updated");
    }

    #[test]
    fn query_prefers_modern_parameter_names() {
        let query = WebhookQuery {
            topic: Some("merchant_order".to_string()),
            event_type: Some("payment".to_string()),
            id: Some("1".to_string()),
            data_id: Some("2".to_string()),
            ..Default::default()
        };

        assert_eq!(query.topic().as_deref(), Some("payment"));
        assert_eq!(query.resource_id().as_deref(), Some("2"));
    }
}
