use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle. A prepaid (session-code) booking is born Confirmed;
/// a gateway-paid booking starts PendingPayment and is moved to Confirmed
/// or Cancelled exactly once by the webhook reconciler or an admin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "PENDING_PAYMENT",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A single customer's claim on a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub slot_id: Uuid,
    pub customer: Customer,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub coupon_id: Option<Uuid>,
    pub session_code_id: Option<Uuid>,
    pub original_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
    /// Gateway payment id, set by the webhook reconciler on first processing.
    pub payment_id: Option<String>,
    /// Gateway checkout-preference id, set at creation for non-prepaid bookings.
    pub preference_id: Option<String>,
    pub status_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_terminal_success(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}
