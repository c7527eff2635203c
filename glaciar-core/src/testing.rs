//! In-memory implementations of the repository and collaborator traits,
//! for engine tests. Enabled via the `testing` feature.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::coupon::DiscountCoupon;
use crate::error::BoxError;
use crate::gateway::{
    CheckoutPreference, CheckoutRequest, GatewayPayment, PaymentGateway,
};
use crate::notify::Notifier;
use crate::package::{OrderStatus, Package, PackageOrder, SessionCode};
use crate::repository::{
    BookingRepository, CatalogRepository, CouponRepository, OrderRepository,
    ScheduleRepository, SessionCodeRepository,
};
use crate::schedule::{AvailabilityRule, CandidateSlot, GeneratedSlot, Professional, Service};

#[derive(Default)]
pub struct MemoryStore {
    pub rules: Mutex<Vec<AvailabilityRule>>,
    pub services: Mutex<Vec<Service>>,
    pub professionals: Mutex<Vec<Professional>>,
    pub packages: Mutex<Vec<Package>>,
    pub slots: Mutex<Vec<GeneratedSlot>>,
    pub bookings: Mutex<Vec<Booking>>,
    pub orders: Mutex<Vec<PackageOrder>>,
    pub codes: Mutex<Vec<SessionCode>>,
    pub coupons: Mutex<Vec<DiscountCoupon>>,
}

impl MemoryStore {
    pub fn with_slot(&self, slot: GeneratedSlot) {
        self.slots.lock().unwrap().push(slot);
    }

    pub fn slot(&self, id: Uuid) -> Option<GeneratedSlot> {
        self.slots.lock().unwrap().iter().find(|s| s.id == id).cloned()
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<PackageOrder> {
        self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, BoxError> {
        Ok(self.services.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn list_services(&self) -> Result<Vec<Service>, BoxError> {
        Ok(self.services.lock().unwrap().clone())
    }

    async fn get_professional(&self, id: Uuid) -> Result<Option<Professional>, BoxError> {
        Ok(self.professionals.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn get_package(&self, id: Uuid) -> Result<Option<Package>, BoxError> {
        Ok(self.packages.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn list_active_rules(&self) -> Result<Vec<AvailabilityRule>, BoxError> {
        Ok(self.rules.lock().unwrap().iter().filter(|r| r.is_active).cloned().collect())
    }

    async fn slots_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
        service_id: Option<Uuid>,
    ) -> Result<Vec<GeneratedSlot>, BoxError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_active && s.start_at >= from && s.start_at < to)
            .filter(|s| professional_id.is_none_or(|p| p == s.professional_id))
            .filter(|s| service_id.is_none_or(|v| v == s.service_id))
            .cloned()
            .collect())
    }

    async fn find_slot(
        &self,
        professional_id: Uuid,
        service_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<Option<GeneratedSlot>, BoxError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .iter()
            .find(|s| {
                s.is_active
                    && s.professional_id == professional_id
                    && s.service_id == service_id
                    && s.start_at == start_at
            })
            .cloned())
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<GeneratedSlot>, BoxError> {
        Ok(self.slot(id))
    }

    async fn insert_slots(&self, slots: &[CandidateSlot]) -> Result<u64, BoxError> {
        let mut store = self.slots.lock().unwrap();
        for c in slots {
            store.push(GeneratedSlot {
                id: Uuid::new_v4(),
                professional_id: c.professional_id,
                service_id: c.service_id,
                start_at: c.start_at,
                end_at: c.end_at,
                max_capacity: c.max_capacity,
                confirmed_bookings: 0,
                is_active: true,
            });
        }
        Ok(slots.len() as u64)
    }

    async fn create_slot(&self, slot: &CandidateSlot) -> Result<GeneratedSlot, BoxError> {
        let created = GeneratedSlot {
            id: Uuid::new_v4(),
            professional_id: slot.professional_id,
            service_id: slot.service_id,
            start_at: slot.start_at,
            end_at: slot.end_at,
            max_capacity: slot.max_capacity,
            confirmed_bookings: 0,
            is_active: true,
        };
        self.slots.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn try_consume_capacity(&self, slot_id: Uuid) -> Result<bool, BoxError> {
        let mut store = self.slots.lock().unwrap();
        match store.iter_mut().find(|s| s.id == slot_id) {
            Some(s) if s.confirmed_bookings < s.max_capacity => {
                s.confirmed_bookings += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_capacity(&self, slot_id: Uuid) -> Result<bool, BoxError> {
        let mut store = self.slots.lock().unwrap();
        match store.iter_mut().find(|s| s.id == slot_id) {
            Some(s) if s.confirmed_bookings > 0 => {
                s.confirmed_bookings -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert(&self, booking: &Booking) -> Result<(), BoxError> {
        self.bookings.lock().unwrap().push(booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        Ok(self.booking(id))
    }

    async fn set_preference(&self, id: Uuid, preference_id: &str) -> Result<(), BoxError> {
        let mut store = self.bookings.lock().unwrap();
        if let Some(b) = store.iter_mut().find(|b| b.id == id) {
            b.preference_id = Some(preference_id.to_string());
        }
        Ok(())
    }

    async fn try_confirm(&self, id: Uuid, payment_id: &str) -> Result<bool, BoxError> {
        let mut store = self.bookings.lock().unwrap();
        match store.iter_mut().find(|b| b.id == id) {
            Some(b) if b.status == BookingStatus::PendingPayment => {
                b.status = BookingStatus::Confirmed;
                b.payment_id = Some(payment_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_pending(&self, id: Uuid, payment_id: &str, detail: &str) -> Result<bool, BoxError> {
        let mut store = self.bookings.lock().unwrap();
        match store.iter_mut().find(|b| b.id == id) {
            Some(b) if b.status == BookingStatus::PendingPayment => {
                b.payment_id = Some(payment_id.to_string());
                b.status_detail = Some(detail.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_cancel_pending(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
        detail: &str,
    ) -> Result<bool, BoxError> {
        let mut store = self.bookings.lock().unwrap();
        match store.iter_mut().find(|b| b.id == id) {
            Some(b) if b.status == BookingStatus::PendingPayment => {
                b.status = BookingStatus::Cancelled;
                if let Some(p) = payment_id {
                    b.payment_id = Some(p.to_string());
                }
                b.status_detail = Some(detail.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_cancel(&self, id: Uuid, detail: &str) -> Result<bool, BoxError> {
        let mut store = self.bookings.lock().unwrap();
        match store.iter_mut().find(|b| b.id == id) {
            Some(b)
                if matches!(
                    b.status,
                    BookingStatus::PendingPayment | BookingStatus::Confirmed
                ) =>
            {
                b.status = BookingStatus::Cancelled;
                b.status_detail = Some(detail.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &PackageOrder) -> Result<(), BoxError> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PackageOrder>, BoxError> {
        Ok(self.order(id))
    }

    async fn set_preference(&self, id: Uuid, preference_id: &str) -> Result<(), BoxError> {
        let mut store = self.orders.lock().unwrap();
        if let Some(o) = store.iter_mut().find(|o| o.id == id) {
            o.preference_id = Some(preference_id.to_string());
        }
        Ok(())
    }

    async fn try_mark_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, BoxError> {
        let mut store = self.orders.lock().unwrap();
        match store.iter_mut().find(|o| o.id == id) {
            Some(o)
                if matches!(o.status, OrderStatus::Created | OrderStatus::PendingPayment) =>
            {
                o.status = OrderStatus::Paid;
                o.payment_id = Some(payment_id.to_string());
                o.paid_at = Some(paid_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_pending(&self, id: Uuid, payment_id: &str, detail: &str) -> Result<bool, BoxError> {
        let mut store = self.orders.lock().unwrap();
        match store.iter_mut().find(|o| o.id == id) {
            Some(o)
                if matches!(o.status, OrderStatus::Created | OrderStatus::PendingPayment) =>
            {
                o.status = OrderStatus::PendingPayment;
                o.payment_id = Some(payment_id.to_string());
                o.status_detail = Some(detail.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_mark_failed(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
        detail: &str,
    ) -> Result<bool, BoxError> {
        let mut store = self.orders.lock().unwrap();
        match store.iter_mut().find(|o| o.id == id) {
            Some(o)
                if matches!(o.status, OrderStatus::Created | OrderStatus::PendingPayment) =>
            {
                o.status = OrderStatus::Failed;
                if let Some(p) = payment_id {
                    o.payment_id = Some(p.to_string());
                }
                o.status_detail = Some(detail.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl SessionCodeRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<SessionCode>, BoxError> {
        Ok(self.codes.lock().unwrap().iter().find(|c| c.code == code).cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SessionCode>, BoxError> {
        Ok(self.codes.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn try_mark_used(
        &self,
        id: Uuid,
        booking_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, BoxError> {
        let mut store = self.codes.lock().unwrap();
        match store.iter_mut().find(|c| c.id == id) {
            Some(c) if !c.is_used => {
                c.is_used = true;
                c.used_in_booking_id = Some(booking_id);
                c.used_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_release(&self, id: Uuid) -> Result<bool, BoxError> {
        let mut store = self.codes.lock().unwrap();
        match store.iter_mut().find(|c| c.id == id) {
            Some(c) if c.is_used => {
                c.is_used = false;
                c.used_in_booking_id = None;
                c.used_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_batch(&self, codes: &[SessionCode]) -> Result<(), BoxError> {
        self.codes.lock().unwrap().extend_from_slice(codes);
        Ok(())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, BoxError> {
        Ok(self.codes.lock().unwrap().iter().any(|c| c.code == code))
    }

    async fn unused_count_for_payment(&self, payment_id: &str) -> Result<i64, BoxError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.payment_id.as_deref() == Some(payment_id) && !c.is_used)
            .count() as i64)
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCoupon>, BoxError> {
        Ok(self.coupons.lock().unwrap().iter().find(|c| c.code == code).cloned())
    }

    async fn increment_uses(&self, id: Uuid) -> Result<(), BoxError> {
        let mut store = self.coupons.lock().unwrap();
        if let Some(c) = store.iter_mut().find(|c| c.id == id) {
            c.current_uses += 1;
        }
        Ok(())
    }
}

/// Gateway fake: preferences echo the external reference, payments are
/// whatever the test seeded. Re-seeding a payment id supersedes the earlier
/// record, so tests can model a payment settling between deliveries.
#[derive(Default)]
pub struct FakeGateway {
    pub payments: Mutex<Vec<GatewayPayment>>,
    pub preferences_created: Mutex<Vec<CheckoutRequest>>,
    pub fail_preference: Mutex<bool>,
}

impl FakeGateway {
    pub fn seed_payment(&self, payment: GatewayPayment) {
        self.payments.lock().unwrap().push(payment);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preference(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutPreference, BoxError> {
        if *self.fail_preference.lock().unwrap() {
            return Err("gateway unavailable".into());
        }
        let id = format!("pref-{}", request.external_reference);
        self.preferences_created.lock().unwrap().push(request.clone());
        Ok(CheckoutPreference {
            init_point: format!("https://gateway.test/checkout/{id}"),
            id,
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, BoxError> {
        self.payments
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| p.id == payment_id)
            .cloned()
            .ok_or_else(|| format!("payment {payment_id} not found").into())
    }
}

/// Notifier that records every call it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn count(&self, prefix: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), BoxError> {
        self.events.lock().unwrap().push(format!("booking_confirmed:{}", booking.id));
        Ok(())
    }

    async fn codes_generated(
        &self,
        order: &PackageOrder,
        codes: &[SessionCode],
    ) -> Result<(), BoxError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("codes_generated:{}:{}", order.id, codes.len()));
        Ok(())
    }

    async fn batch_depleted(&self, payment_id: &str, _buyer_email: &str) -> Result<(), BoxError> {
        self.events.lock().unwrap().push(format!("batch_depleted:{payment_id}"));
        Ok(())
    }

    async fn crm_upsert(&self, email: &str, _context: serde_json::Value) -> Result<(), BoxError> {
        self.events.lock().unwrap().push(format!("crm_upsert:{email}"));
        Ok(())
    }
}
