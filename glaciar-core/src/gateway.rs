use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// Input for creating a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    /// Echoed back by the gateway; carries the target booking/order id.
    pub external_reference: String,
    pub title: String,
    /// CLP, zero-decimal.
    pub amount: i64,
    pub payer_email: String,
    pub success_url: String,
    pub failure_url: String,
    pub pending_url: String,
    pub notification_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutPreference {
    pub id: String,
    /// URL the customer is redirected to for payment.
    pub init_point: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
    Unknown,
}

impl GatewayPaymentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => GatewayPaymentStatus::Approved,
            "pending" => GatewayPaymentStatus::Pending,
            "in_process" => GatewayPaymentStatus::InProcess,
            "rejected" => GatewayPaymentStatus::Rejected,
            "cancelled" => GatewayPaymentStatus::Cancelled,
            "refunded" => GatewayPaymentStatus::Refunded,
            _ => GatewayPaymentStatus::Unknown,
        }
    }

    /// Pending and in-process both mean "not settled yet".
    pub fn is_pending(&self) -> bool {
        matches!(self, GatewayPaymentStatus::Pending | GatewayPaymentStatus::InProcess)
    }
}

/// The authoritative payment record, fetched from the gateway's API. The
/// webhook body is never trusted for amount or status; only this is.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: GatewayPaymentStatus,
    pub status_detail: Option<String>,
    pub transaction_amount: i64,
    pub external_reference: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout preference for an amount.
    async fn create_preference(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutPreference, BoxError>;

    /// Fetch the authoritative payment record by gateway payment id.
    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, BoxError>;
}
