use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::Booking;
use crate::coupon::DiscountCoupon;
use crate::error::BoxError;
use crate::package::{Package, PackageOrder, SessionCode};
use crate::schedule::{AvailabilityRule, CandidateSlot, GeneratedSlot, Professional, Service};

/// Read access to the studio catalog (services, professionals, packages).
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, BoxError>;

    async fn list_services(&self) -> Result<Vec<Service>, BoxError>;

    async fn get_professional(&self, id: Uuid) -> Result<Option<Professional>, BoxError>;

    async fn get_package(&self, id: Uuid) -> Result<Option<Package>, BoxError>;
}

/// Availability rules and materialized slots.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn list_active_rules(&self) -> Result<Vec<AvailabilityRule>, BoxError>;

    /// Active slots whose start falls in [from, to), optionally filtered.
    async fn slots_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
        service_id: Option<Uuid>,
    ) -> Result<Vec<GeneratedSlot>, BoxError>;

    /// The single active slot identified by (professional, service, start).
    async fn find_slot(
        &self,
        professional_id: Uuid,
        service_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<Option<GeneratedSlot>, BoxError>;

    async fn get_slot(&self, id: Uuid) -> Result<Option<GeneratedSlot>, BoxError>;

    /// Bulk insert for the materializer. Returns rows written.
    async fn insert_slots(&self, slots: &[CandidateSlot]) -> Result<u64, BoxError>;

    /// Just-in-time creation of a single slot with zero confirmed bookings.
    async fn create_slot(&self, slot: &CandidateSlot) -> Result<GeneratedSlot, BoxError>;

    /// CAS: increment `confirmed_bookings` only while strictly below
    /// `max_capacity`. Returns whether a row was affected.
    async fn try_consume_capacity(&self, slot_id: Uuid) -> Result<bool, BoxError>;

    /// Guarded compensating decrement, never below zero. Returns whether a
    /// row was affected.
    async fn release_capacity(&self, slot_id: Uuid) -> Result<bool, BoxError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<(), BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxError>;

    async fn set_preference(&self, id: Uuid, preference_id: &str) -> Result<(), BoxError>;

    /// CAS: move to CONFIRMED only while still PENDING_PAYMENT, recording the
    /// gateway payment id. Returns whether a row was affected.
    async fn try_confirm(&self, id: Uuid, payment_id: &str) -> Result<bool, BoxError>;

    /// Record a gateway "pending" status without touching terminal rows.
    async fn mark_pending(
        &self,
        id: Uuid,
        payment_id: &str,
        detail: &str,
    ) -> Result<bool, BoxError>;

    /// CAS: move to CANCELLED only while still PENDING_PAYMENT.
    async fn try_cancel_pending(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
        detail: &str,
    ) -> Result<bool, BoxError>;

    /// Admin cancel: CAS from PENDING_PAYMENT or CONFIRMED to CANCELLED.
    async fn try_cancel(&self, id: Uuid, detail: &str) -> Result<bool, BoxError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &PackageOrder) -> Result<(), BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<PackageOrder>, BoxError>;

    async fn set_preference(&self, id: Uuid, preference_id: &str) -> Result<(), BoxError>;

    /// CAS: move to `paid` only while still `created`/`pending_payment`.
    async fn try_mark_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, BoxError>;

    async fn mark_pending(
        &self,
        id: Uuid,
        payment_id: &str,
        detail: &str,
    ) -> Result<bool, BoxError>;

    /// CAS: move to `failed` only while still non-terminal.
    async fn try_mark_failed(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
        detail: &str,
    ) -> Result<bool, BoxError>;
}

#[async_trait]
pub trait SessionCodeRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<SessionCode>, BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<SessionCode>, BoxError>;

    /// CAS: mark used only while `is_used = false`, linking the booking.
    async fn try_mark_used(
        &self,
        id: Uuid,
        booking_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, BoxError>;

    /// CAS: clear `is_used`, `used_in_booking_id` and `used_at`, only while
    /// currently used. The cancel-and-release path.
    async fn try_release(&self, id: Uuid) -> Result<bool, BoxError>;

    async fn insert_batch(&self, codes: &[SessionCode]) -> Result<(), BoxError>;

    async fn code_exists(&self, code: &str) -> Result<bool, BoxError>;

    /// Unused codes remaining in the purchase batch that a payment created.
    async fn unused_count_for_payment(&self, payment_id: &str) -> Result<i64, BoxError>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCoupon>, BoxError>;

    /// Best-effort usage counter bump. Not part of any CAS; see DESIGN.md.
    async fn increment_uses(&self, id: Uuid) -> Result<(), BoxError>;
}
