use async_trait::async_trait;

use crate::booking::Booking;
use crate::error::BoxError;
use crate::package::{PackageOrder, SessionCode};

/// Outbound fire-and-forget collaborators: confirmation mail, code delivery,
/// staff alerts, CRM upsert. Failures are logged by callers and never unwind
/// an already-committed state transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), BoxError>;

    async fn codes_generated(
        &self,
        order: &PackageOrder,
        codes: &[SessionCode],
    ) -> Result<(), BoxError>;

    /// Staff alert: the purchase batch behind `payment_id` has no unused
    /// codes left.
    async fn batch_depleted(&self, payment_id: &str, buyer_email: &str) -> Result<(), BoxError>;

    async fn crm_upsert(&self, email: &str, context: serde_json::Value) -> Result<(), BoxError>;
}

/// No-op notifier for tests and local runs without outbound integrations.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn booking_confirmed(&self, _booking: &Booking) -> Result<(), BoxError> {
        Ok(())
    }

    async fn codes_generated(
        &self,
        _order: &PackageOrder,
        _codes: &[SessionCode],
    ) -> Result<(), BoxError> {
        Ok(())
    }

    async fn batch_depleted(&self, _payment_id: &str, _buyer_email: &str) -> Result<(), BoxError> {
        Ok(())
    }

    async fn crm_upsert(&self, _email: &str, _context: serde_json::Value) -> Result<(), BoxError> {
        Ok(())
    }
}
