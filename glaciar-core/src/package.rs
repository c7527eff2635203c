use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable multi-session package or gift card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub sessions: i32,
    /// Price in CLP.
    pub price: i64,
    /// Codes expire this many days after the order is paid.
    pub validity_days: i64,
    /// Services a code from this package can be redeemed for.
    pub applicable_service_ids: Vec<Uuid>,
    pub is_gift: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    PendingPayment,
    Paid,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// A package/gift-card purchase. Same reconciliation shape as a booking:
/// reaches `paid` exactly once, at which point its session codes are cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageOrder {
    pub id: Uuid,
    pub package_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub status: OrderStatus,
    pub coupon_id: Option<Uuid>,
    pub original_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
    pub payment_id: Option<String>,
    pub preference_id: Option<String>,
    pub status_detail: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageOrder {
    pub fn is_terminal_success(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}

/// A prepaid, single-use voucher redeemable for one booking.
///
/// Once `is_used` is set it stays set unless an explicit cancel-and-release
/// clears it together with `used_in_booking_id` and `used_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCode {
    pub id: Uuid,
    pub code: String,
    pub order_id: Uuid,
    /// Gateway payment that paid for this code's batch.
    pub payment_id: Option<String>,
    pub applicable_service_ids: Vec<Uuid>,
    pub buyer_email: String,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_in_booking_id: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub gift_token: Option<String>,
}
