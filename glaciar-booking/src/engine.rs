use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use glaciar_core::booking::{Booking, BookingStatus, Customer};
use glaciar_core::error::{EngineError, Rejection};
use glaciar_core::gateway::{CheckoutRequest, PaymentGateway};
use glaciar_core::notify::Notifier;
use glaciar_core::package::SessionCode;
use glaciar_core::repository::{
    BookingRepository, CatalogRepository, CouponRepository, ScheduleRepository,
    SessionCodeRepository,
};
use glaciar_core::schedule::Service;

use crate::codes::validate_session_code;
use crate::coupons::apply_coupon;
use crate::slots::SlotResolver;

/// Callback/notification URLs handed to the payment gateway.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
    pub notification: String,
}

#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub customer: Customer,
    pub coupon_code: Option<String>,
    pub session_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    /// Checkout link; absent for prepaid bookings.
    pub init_point: Option<String>,
}

/// Creates bookings: prices server-side, validates codes/coupons, resolves
/// the slot, and either confirms immediately (prepaid) or opens a gateway
/// checkout. Capacity is consumed only on confirmation.
pub struct BookingEngine {
    catalog: Arc<dyn CatalogRepository>,
    schedule: Arc<dyn ScheduleRepository>,
    bookings: Arc<dyn BookingRepository>,
    codes: Arc<dyn SessionCodeRepository>,
    coupons: Arc<dyn CouponRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    slot_resolver: SlotResolver,
    urls: CheckoutUrls,
}

impl BookingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        schedule: Arc<dyn ScheduleRepository>,
        bookings: Arc<dyn BookingRepository>,
        codes: Arc<dyn SessionCodeRepository>,
        coupons: Arc<dyn CouponRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            catalog,
            schedule: schedule.clone(),
            bookings,
            codes,
            coupons,
            gateway,
            notifier,
            slot_resolver: SlotResolver::new(schedule),
            urls,
        }
    }

    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, EngineError> {
        let service = self
            .catalog
            .get_service(request.service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(Rejection::ServiceNotFound)?;
        self.catalog
            .get_professional(request.professional_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(Rejection::ProfessionalNotFound)?;

        // Price is always the stored service price; nothing in the request
        // is trusted for money.
        let original_price = service.price;

        if let Some(code_str) = request.session_code.as_deref() {
            let code = self
                .codes
                .find_by_code(code_str)
                .await?
                .ok_or(Rejection::CodeNotFound)?;
            validate_session_code(&code, service.id, now)?;
            return self.create_prepaid(request, &service, code, original_price, now).await;
        }

        let mut coupon_id = None;
        let mut discount_amount = 0;
        if let Some(coupon_code) = request.coupon_code.as_deref() {
            let coupon = self
                .coupons
                .find_by_code(coupon_code)
                .await?
                .ok_or_else(|| Rejection::CouponInvalid("el cupón no existe".into()))?;
            let applied = apply_coupon(&coupon, original_price, None, now)?;
            // Best-effort counter bump, outside the confirmation CAS.
            if let Err(e) = self.coupons.increment_uses(coupon.id).await {
                warn!(coupon = %coupon.code, error = %e, "failed to bump coupon usage");
            }
            coupon_id = Some(applied.coupon_id);
            discount_amount = applied.discount_amount;
        }
        let final_price = (original_price - discount_amount).max(0);

        let slot = self
            .slot_resolver
            .resolve_or_create(request.professional_id, &service, request.start_at, now)
            .await?;

        let booking = Booking {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            service_id: service.id,
            slot_id: slot.id,
            customer: request.customer,
            start_at: slot.start_at,
            end_at: slot.end_at,
            status: BookingStatus::PendingPayment,
            coupon_id,
            session_code_id: None,
            original_price,
            discount_amount,
            final_price,
            payment_id: None,
            preference_id: None,
            status_detail: None,
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(&booking).await?;

        // Capacity is NOT consumed here: several pending checkouts may race
        // for the last spot, and confirmation-time CAS settles it.
        let preference = self
            .gateway
            .create_preference(&CheckoutRequest {
                external_reference: format!("booking:{}", booking.id),
                title: service.name.clone(),
                amount: final_price,
                payer_email: booking.customer.email.clone(),
                success_url: self.urls.success.clone(),
                failure_url: self.urls.failure.clone(),
                pending_url: self.urls.pending.clone(),
                notification_url: self.urls.notification.clone(),
            })
            .await?;
        self.bookings.set_preference(booking.id, &preference.id).await?;

        info!(booking_id = %booking.id, preference = %preference.id, "booking pending payment");
        Ok(BookingOutcome {
            booking_id: booking.id,
            status: BookingStatus::PendingPayment,
            init_point: Some(preference.init_point),
        })
    }

    /// Prepaid path: the booking is born CONFIRMED with zero final price,
    /// the code is consumed via CAS, and capacity is taken immediately.
    async fn create_prepaid(
        &self,
        request: CreateBookingRequest,
        service: &Service,
        code: SessionCode,
        original_price: i64,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, EngineError> {
        let slot = self
            .slot_resolver
            .resolve_or_create(request.professional_id, service, request.start_at, now)
            .await?;

        let booking = Booking {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            service_id: service.id,
            slot_id: slot.id,
            customer: request.customer,
            start_at: slot.start_at,
            end_at: slot.end_at,
            status: BookingStatus::Confirmed,
            coupon_id: None,
            session_code_id: Some(code.id),
            original_price,
            discount_amount: original_price,
            final_price: 0,
            payment_id: None,
            preference_id: None,
            status_detail: None,
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(&booking).await?;

        // Lost the race for the code: undo the booking row and report it.
        if !self.codes.try_mark_used(code.id, booking.id, now).await? {
            self.bookings.try_cancel(booking.id, "código utilizado por otra reserva").await?;
            return Err(Rejection::CodeUsed.into());
        }

        if !self.schedule.try_consume_capacity(slot.id).await? {
            self.bookings.try_cancel(booking.id, "sin cupos al confirmar").await?;
            self.codes.try_release(code.id).await?;
            return Err(Rejection::NoCapacity.into());
        }

        self.post_confirmation_effects(&booking, &code).await;

        info!(booking_id = %booking.id, code = %code.code, "prepaid booking confirmed");
        Ok(BookingOutcome {
            booking_id: booking.id,
            status: BookingStatus::Confirmed,
            init_point: None,
        })
    }

    /// Fire-and-forget side effects after a prepaid confirmation. Failures
    /// are logged and never unwind the committed booking.
    async fn post_confirmation_effects(&self, booking: &Booking, code: &SessionCode) {
        if let Some(payment_id) = code.payment_id.as_deref() {
            match self.codes.unused_count_for_payment(payment_id).await {
                Ok(0) => {
                    if let Err(e) =
                        self.notifier.batch_depleted(payment_id, &code.buyer_email).await
                    {
                        warn!(error = %e, "depletion alert failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "could not count remaining codes"),
            }
        }
        if let Err(e) = self.notifier.booking_confirmed(booking).await {
            warn!(booking_id = %booking.id, error = %e, "confirmation notification failed");
        }
        if let Err(e) = self
            .notifier
            .crm_upsert(
                &booking.customer.email,
                serde_json::json!({ "last_booking_id": booking.id }),
            )
            .await
        {
            warn!(error = %e, "crm upsert failed");
        }
    }

    /// Standalone code validation; no side effects.
    pub async fn validate_code(
        &self,
        code_str: &str,
        service_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionCode, EngineError> {
        let code = self
            .codes
            .find_by_code(code_str)
            .await?
            .ok_or(Rejection::CodeNotFound)?;
        validate_session_code(&code, service_id, now)?;
        Ok(code)
    }

    /// Admin cancellation. Releases an attached session code and, for a
    /// previously confirmed booking, gives the capacity back.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<(), EngineError> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| Rejection::Validation("reserva no encontrada".into()))?;

        if !self.bookings.try_cancel(booking_id, "cancelada por administración").await? {
            // Already cancelled/completed; treat as settled.
            return Ok(());
        }

        if booking.status == BookingStatus::Confirmed
            && !self.schedule.release_capacity(booking.slot_id).await?
        {
            warn!(slot_id = %booking.slot_id, "capacity release affected no row");
        }
        if let Some(code_id) = booking.session_code_id {
            self.codes.try_release(code_id).await?;
        }

        info!(%booking_id, "booking cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime, TimeZone};
    use glaciar_core::schedule::{AvailabilityRule, GeneratedSlot, Professional, RecurrenceKind};
    use glaciar_core::testing::{FakeGateway, MemoryStore, RecordingNotifier};

    struct Fixture {
        store: Arc<MemoryStore>,
        gateway: Arc<FakeGateway>,
        notifier: Arc<RecordingNotifier>,
        engine: BookingEngine,
        professional_id: Uuid,
        service_id: Uuid,
    }

    fn urls() -> CheckoutUrls {
        CheckoutUrls {
            success: "https://studio.cl/pago/ok".into(),
            failure: "https://studio.cl/pago/error".into(),
            pending: "https://studio.cl/pago/pendiente".into(),
            notification: "https://studio.cl/api/webhooks/payments".into(),
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let professional_id = Uuid::new_v4();
        let service_id = Uuid::new_v4();
        store.professionals.lock().unwrap().push(Professional {
            id: professional_id,
            name: "Marcela".into(),
            is_active: true,
        });
        store.services.lock().unwrap().push(Service {
            id: service_id,
            name: "Ice Bath".into(),
            price: 30000,
            duration_minutes: 60,
            max_capacity: 2,
            is_active: true,
        });
        // Mondays 09:00-11:00 local.
        store.rules.lock().unwrap().push(AvailabilityRule {
            id: Uuid::new_v4(),
            professional_id,
            service_id,
            recurrence: RecurrenceKind::Weekly,
            day_of_week: Some(1),
            specific_date: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            duration_minutes: 60,
            max_days_in_future: 30,
            min_hours_before_booking: 2,
            is_active: true,
        });

        let engine = BookingEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            notifier.clone(),
            urls(),
        );
        Fixture { store, gateway, notifier, engine, professional_id, service_id }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    /// Monday 2026-03-16 09:00 local = 12:00 UTC.
    fn slot_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 16, 12, 0, 0).unwrap()
    }

    fn request(f: &Fixture) -> CreateBookingRequest {
        CreateBookingRequest {
            professional_id: f.professional_id,
            service_id: f.service_id,
            start_at: slot_start(),
            customer: Customer {
                name: "Ana Soto".into(),
                email: "ana@example.cl".into(),
                phone: None,
            },
            coupon_code: None,
            session_code: None,
        }
    }

    fn seed_code(f: &Fixture, code: &str) -> Uuid {
        let id = Uuid::new_v4();
        f.store.codes.lock().unwrap().push(SessionCode {
            id,
            code: code.to_string(),
            order_id: Uuid::new_v4(),
            payment_id: Some("777".to_string()),
            applicable_service_ids: vec![f.service_id],
            buyer_email: "ana@example.cl".into(),
            purchased_at: now() - Duration::days(5),
            expires_at: now() + Duration::days(85),
            is_used: false,
            used_in_booking_id: None,
            used_at: None,
            gift_token: None,
        });
        id
    }

    #[tokio::test]
    async fn gateway_booking_creates_slot_jit_and_returns_init_point() {
        let f = fixture();
        let outcome = f.engine.create_booking(request(&f), now()).await.unwrap();

        assert_eq!(outcome.status, BookingStatus::PendingPayment);
        assert!(outcome.init_point.is_some());

        let booking = f.store.booking(outcome.booking_id).unwrap();
        assert_eq!(booking.final_price, 30000);
        assert!(booking.preference_id.is_some());

        // The slot was created just-in-time and holds no capacity yet.
        let slot = f.store.slot(booking.slot_id).unwrap();
        assert_eq!(slot.confirmed_bookings, 0);

        // The preference carried the server-side price and the booking ref.
        let prefs = f.gateway.preferences_created.lock().unwrap();
        assert_eq!(prefs[0].amount, 30000);
        assert_eq!(prefs[0].external_reference, format!("booking:{}", booking.id));
    }

    #[tokio::test]
    async fn coupon_discount_is_computed_server_side() {
        let f = fixture();
        f.store.coupons.lock().unwrap().push(glaciar_core::coupon::DiscountCoupon {
            id: Uuid::new_v4(),
            code: "HIELO20".into(),
            discount_type: glaciar_core::coupon::DiscountType::Percentage,
            discount_value: 20,
            valid_from: None,
            valid_until: None,
            max_uses: Some(10),
            current_uses: 0,
            min_purchase_amount: None,
            allowed_package_ids: vec![],
            is_active: true,
        });

        let mut req = request(&f);
        req.coupon_code = Some("HIELO20".into());
        let outcome = f.engine.create_booking(req, now()).await.unwrap();

        let booking = f.store.booking(outcome.booking_id).unwrap();
        assert_eq!(booking.original_price, 30000);
        assert_eq!(booking.discount_amount, 6000);
        assert_eq!(booking.final_price, 24000);
        assert_eq!(f.store.coupons.lock().unwrap()[0].current_uses, 1);
    }

    #[tokio::test]
    async fn prepaid_booking_confirms_consumes_code_and_capacity() {
        let f = fixture();
        let code_id = seed_code(&f, "GLC-AAAA1111");

        let mut req = request(&f);
        req.session_code = Some("GLC-AAAA1111".into());
        let outcome = f.engine.create_booking(req, now()).await.unwrap();

        assert_eq!(outcome.status, BookingStatus::Confirmed);
        assert!(outcome.init_point.is_none());

        let booking = f.store.booking(outcome.booking_id).unwrap();
        assert_eq!(booking.final_price, 0);
        assert_eq!(booking.session_code_id, Some(code_id));

        let code = f.store.codes.lock().unwrap()[0].clone();
        assert!(code.is_used);
        assert_eq!(code.used_in_booking_id, Some(booking.id));

        let slot = f.store.slot(booking.slot_id).unwrap();
        assert_eq!(slot.confirmed_bookings, 1);

        // The only code of payment 777 was consumed: depletion alert fired.
        assert_eq!(f.notifier.count("batch_depleted:777"), 1);
        assert_eq!(f.notifier.count("booking_confirmed"), 1);
    }

    #[tokio::test]
    async fn second_redemption_of_same_code_is_code_used() {
        let f = fixture();
        seed_code(&f, "GLC-AAAA1111");

        let mut req = request(&f);
        req.session_code = Some("GLC-AAAA1111".into());
        f.engine.create_booking(req.clone(), now()).await.unwrap();

        // Different slot time, same code.
        req.start_at = slot_start() + Duration::hours(1);
        let err = f.engine.create_booking(req, now()).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(Rejection::CodeUsed)));
    }

    #[tokio::test]
    async fn full_slot_is_rejected_with_no_capacity() {
        let f = fixture();
        f.store.with_slot(GeneratedSlot {
            id: Uuid::new_v4(),
            professional_id: f.professional_id,
            service_id: f.service_id,
            start_at: slot_start(),
            end_at: slot_start() + Duration::minutes(60),
            max_capacity: 2,
            confirmed_bookings: 2,
            is_active: true,
        });

        let err = f.engine.create_booking(request(&f), now()).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(Rejection::NoCapacity)));
        assert!(f.store.bookings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn time_not_backed_by_any_rule_is_invalid_slot() {
        let f = fixture();
        let mut req = request(&f);
        // 14:00 local on Monday; the rule ends at 11:00.
        req.start_at = Utc.with_ymd_and_hms(2026, 3, 16, 17, 0, 0).unwrap();

        let err = f.engine.create_booking(req, now()).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(Rejection::InvalidSlot)));
        assert!(f.store.slots.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_as_internal_error() {
        let f = fixture();
        *f.gateway.fail_preference.lock().unwrap() = true;

        let err = f.engine.create_booking(request(&f), now()).await.unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[tokio::test]
    async fn cancel_confirmed_prepaid_booking_releases_code_and_capacity() {
        let f = fixture();
        seed_code(&f, "GLC-AAAA1111");
        let mut req = request(&f);
        req.session_code = Some("GLC-AAAA1111".into());
        let outcome = f.engine.create_booking(req, now()).await.unwrap();

        f.engine.cancel_booking(outcome.booking_id).await.unwrap();

        let booking = f.store.booking(outcome.booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        let code = f.store.codes.lock().unwrap()[0].clone();
        assert!(!code.is_used);
        assert!(code.used_in_booking_id.is_none());
        let slot = f.store.slot(booking.slot_id).unwrap();
        assert_eq!(slot.confirmed_bookings, 0);
    }
}
