//! Provider REST API response bodies.
//!
//! Only the fields the reconciler reads are modelled; everything else is
//! ignored by serde.

use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    MerchantOrderPayment, ProviderMerchantOrder, ProviderPayment, ProviderSubscription,
};

/// Ids arrive as JSON numbers for payments and orders and as strings for
/// preapprovals.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

/// `GET /preapproval/{id}`
#[derive(Debug, Deserialize)]
pub struct MpPreapproval {
    pub id: WireId,
    pub status: String,
    pub external_reference: Option<String>,
    pub reason: Option<String>,
    pub payer_email: Option<String>,
}

impl From<MpPreapproval> for ProviderSubscription {
    fn from(wire: MpPreapproval) -> Self {
        Self {
            id: wire.id.into_string(),
            status: wire.status,
            external_reference: non_empty(wire.external_reference),
            reason: wire.reason,
            payer_email: wire.payer_email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MpPayer {
    pub email: Option<String>,
}

/// `GET /v1/payments/{id}`
#[derive(Debug, Deserialize)]
pub struct MpPayment {
    pub id: WireId,
    pub status: String,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    #[serde(default)]
    pub transaction_amount: f64,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub date_created: Option<String>,
    pub date_approved: Option<String>,
    pub payer: Option<MpPayer>,
}

impl From<MpPayment> for ProviderPayment {
    fn from(wire: MpPayment) -> Self {
        Self {
            id: wire.id.into_string(),
            status: wire.status,
            status_detail: wire.status_detail,
            external_reference: non_empty(wire.external_reference),
            transaction_amount: wire.transaction_amount,
            payment_method_id: wire.payment_method_id,
            payment_type_id: wire.payment_type_id,
            date_created: wire.date_created.as_deref().and_then(Timestamp::parse_rfc3339),
            date_approved: wire.date_approved.as_deref().and_then(Timestamp::parse_rfc3339),
            payer_email: wire.payer.and_then(|p| p.email),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MpOrderPayment {
    pub id: WireId,
    pub status: String,
    pub transaction_amount: Option<f64>,
}

/// `GET /merchant_orders/{id}`
#[derive(Debug, Deserialize)]
pub struct MpMerchantOrder {
    pub id: WireId,
    pub status: Option<String>,
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payments: Vec<MpOrderPayment>,
}

impl From<MpMerchantOrder> for ProviderMerchantOrder {
    fn from(wire: MpMerchantOrder) -> Self {
        Self {
            id: wire.id.into_string(),
            status: wire.status,
            external_reference: non_empty(wire.external_reference),
            payments: wire
                .payments
                .into_iter()
                .map(|p| MerchantOrderPayment {
                    id: p.id.into_string(),
                    status: p.status,
                    transaction_amount: p.transaction_amount,
                })
                .collect(),
        }
    }
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct MpErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
