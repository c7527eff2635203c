use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};
use uuid::Uuid;

use glaciar_core::booking::{Booking, BookingStatus};
use glaciar_core::error::EngineError;
use glaciar_core::gateway::{GatewayPayment, GatewayPaymentStatus, PaymentGateway};
use glaciar_core::notify::Notifier;
use glaciar_core::package::{OrderStatus, Package, PackageOrder, SessionCode};
use glaciar_core::repository::{
    BookingRepository, CatalogRepository, CouponRepository, OrderRepository,
    ScheduleRepository, SessionCodeRepository,
};

use crate::signature::{verify_signature, SignatureParts};
use crate::status_text::rejection_detail_text;

/// Allowed drift between the gateway-reported amount and the stored final
/// price, for zero-decimal currency rounding.
const AMOUNT_TOLERANCE: i64 = 1;

const CODE_LENGTH: usize = 8;
const CODE_PREFIX: &str = "GLC-";
const CODE_GENERATION_ATTEMPTS: usize = 10;

/// A gateway notification after transport-level parsing. The body is only
/// trusted to locate the payment; amount and status come from the API.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    /// Gateway topic, e.g. "payment"; everything else is ignored.
    pub topic: String,
    pub payment_id: String,
    pub request_id: Option<String>,
    pub signature: Option<SignatureParts>,
}

/// Always-acknowledge outcomes. Only transport/internal errors bubble as
/// `Err`, which is what triggers gateway-side redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    /// Non-payment topic or unrecognized external reference.
    Ignored,
    /// Signature mismatch; the API layer answers 401.
    Unauthorized,
    /// This delivery won the conditional update and ran the side effects.
    Processed,
    /// A concurrent or earlier delivery already settled the record.
    AlreadyProcessed,
    /// Payment still pending at the gateway.
    Pending,
    /// Payment rejected/cancelled, or amount mismatch.
    Failed,
}

/// Reconciles at-least-once, unordered gateway notifications against
/// booking and order state. The single concurrency primitive is the
/// conditional update (CAS) plus affected-row check.
pub struct WebhookReconciler {
    gateway: Arc<dyn PaymentGateway>,
    bookings: Arc<dyn BookingRepository>,
    orders: Arc<dyn OrderRepository>,
    codes: Arc<dyn SessionCodeRepository>,
    coupons: Arc<dyn CouponRepository>,
    schedule: Arc<dyn ScheduleRepository>,
    catalog: Arc<dyn CatalogRepository>,
    notifier: Arc<dyn Notifier>,
    webhook_secret: Option<String>,
}

enum Target {
    Booking(Uuid),
    Order(Uuid),
}

fn parse_external_reference(reference: &str) -> Option<Target> {
    if let Some(raw) = reference.strip_prefix("booking:") {
        return Uuid::parse_str(raw).ok().map(Target::Booking);
    }
    if let Some(raw) = reference.strip_prefix("order:") {
        return Uuid::parse_str(raw).ok().map(Target::Order);
    }
    None
}

impl WebhookReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        bookings: Arc<dyn BookingRepository>,
        orders: Arc<dyn OrderRepository>,
        codes: Arc<dyn SessionCodeRepository>,
        coupons: Arc<dyn CouponRepository>,
        schedule: Arc<dyn ScheduleRepository>,
        catalog: Arc<dyn CatalogRepository>,
        notifier: Arc<dyn Notifier>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            gateway,
            bookings,
            orders,
            codes,
            coupons,
            schedule,
            catalog,
            notifier,
            webhook_secret,
        }
    }

    pub async fn handle_notification(
        &self,
        notification: PaymentNotification,
        now: DateTime<Utc>,
    ) -> Result<WebhookAck, EngineError> {
        if notification.topic != "payment" {
            return Ok(WebhookAck::Ignored);
        }

        // Formats without signed headers skip this and rely on the
        // authoritative fetch below for integrity.
        if let (Some(secret), Some(signature)) =
            (self.webhook_secret.as_deref(), notification.signature.as_ref())
        {
            let request_id = notification.request_id.as_deref().unwrap_or_default();
            if !verify_signature(secret, &notification.payment_id, request_id, signature) {
                warn!(payment_id = %notification.payment_id, "webhook signature mismatch");
                return Ok(WebhookAck::Unauthorized);
            }
        }

        let payment = self.gateway.get_payment(&notification.payment_id).await?;

        let Some(target) = payment
            .external_reference
            .as_deref()
            .and_then(parse_external_reference)
        else {
            info!(
                payment_id = %payment.id,
                reference = ?payment.external_reference,
                "unrecognized external reference, acknowledging"
            );
            return Ok(WebhookAck::Ignored);
        };

        match target {
            Target::Booking(id) => self.reconcile_booking(id, &payment).await,
            Target::Order(id) => self.reconcile_order(id, &payment, now).await,
        }
    }

    async fn reconcile_booking(
        &self,
        booking_id: Uuid,
        payment: &GatewayPayment,
    ) -> Result<WebhookAck, EngineError> {
        let Some(booking) = self.bookings.get(booking_id).await? else {
            info!(%booking_id, "notification for unknown booking, acknowledging");
            return Ok(WebhookAck::Ignored);
        };

        // Idempotency gate: only terminal records short-circuit. A payment
        // id recorded while the gateway still reported pending must not
        // block the later approved delivery of the same payment.
        if booking.is_terminal_success()
            || (booking.status == BookingStatus::Cancelled
                && booking.payment_id.as_deref() == Some(&payment.id))
        {
            return Ok(WebhookAck::AlreadyProcessed);
        }

        if payment.status.is_pending() {
            self.bookings
                .mark_pending(booking_id, &payment.id, detail_of(payment))
                .await?;
            return Ok(WebhookAck::Pending);
        }

        if payment.status != GatewayPaymentStatus::Approved {
            let detail = rejection_detail_text(detail_of(payment));
            let moved = self
                .bookings
                .try_cancel_pending(booking_id, Some(&payment.id), detail)
                .await?;
            return Ok(if moved { WebhookAck::Failed } else { WebhookAck::AlreadyProcessed });
        }

        if (payment.transaction_amount - booking.final_price).abs() > AMOUNT_TOLERANCE {
            warn!(
                %booking_id,
                expected = booking.final_price,
                received = payment.transaction_amount,
                "amount mismatch, cancelling booking"
            );
            self.bookings
                .try_cancel_pending(
                    booking_id,
                    Some(&payment.id),
                    "el monto pagado no coincide con la reserva",
                )
                .await?;
            return Ok(WebhookAck::Failed);
        }

        // The CAS that prevents duplicate fulfillment: only one delivery
        // moves PENDING_PAYMENT to CONFIRMED.
        if !self.bookings.try_confirm(booking_id, &payment.id).await? {
            return Ok(WebhookAck::AlreadyProcessed);
        }

        // Final capacity check. A preference was issued without reserving
        // capacity, so the last confirmation can still find the slot full.
        if !self.schedule.try_consume_capacity(booking.slot_id).await? {
            warn!(%booking_id, slot_id = %booking.slot_id, "slot full at confirmation");
            self.bookings
                .try_cancel(booking_id, "sin cupos al confirmar el pago")
                .await?;
            return Ok(WebhookAck::Failed);
        }

        self.booking_side_effects(&booking).await;
        info!(%booking_id, payment_id = %payment.id, "booking confirmed by webhook");
        Ok(WebhookAck::Processed)
    }

    async fn reconcile_order(
        &self,
        order_id: Uuid,
        payment: &GatewayPayment,
        now: DateTime<Utc>,
    ) -> Result<WebhookAck, EngineError> {
        let Some(order) = self.orders.get(order_id).await? else {
            info!(%order_id, "notification for unknown order, acknowledging");
            return Ok(WebhookAck::Ignored);
        };

        if order.is_terminal_success()
            || (order.status == OrderStatus::Failed
                && order.payment_id.as_deref() == Some(&payment.id))
        {
            return Ok(WebhookAck::AlreadyProcessed);
        }

        if payment.status.is_pending() {
            self.orders
                .mark_pending(order_id, &payment.id, detail_of(payment))
                .await?;
            return Ok(WebhookAck::Pending);
        }

        if payment.status != GatewayPaymentStatus::Approved {
            let detail = rejection_detail_text(detail_of(payment));
            let moved = self
                .orders
                .try_mark_failed(order_id, Some(&payment.id), detail)
                .await?;
            return Ok(if moved { WebhookAck::Failed } else { WebhookAck::AlreadyProcessed });
        }

        if (payment.transaction_amount - order.final_price).abs() > AMOUNT_TOLERANCE {
            warn!(
                %order_id,
                expected = order.final_price,
                received = payment.transaction_amount,
                "amount mismatch, failing order"
            );
            self.orders
                .try_mark_failed(
                    order_id,
                    Some(&payment.id),
                    "el monto pagado no coincide con la compra",
                )
                .await?;
            return Ok(WebhookAck::Failed);
        }

        if !self.orders.try_mark_paid(order_id, &payment.id, now).await? {
            return Ok(WebhookAck::AlreadyProcessed);
        }

        let Some(package) = self.catalog.get_package(order.package_id).await? else {
            // Order already paid; the missing package is an operator problem,
            // not a reason to re-deliver.
            warn!(%order_id, package_id = %order.package_id, "paid order references missing package");
            return Ok(WebhookAck::Processed);
        };

        // Past this point the order is PAID. If code generation or insertion
        // fails, the retried delivery acks AlreadyProcessed and the order is
        // left paid without codes; operators repair those by hand.
        let codes = self.cut_session_codes(&order, &package, &payment.id, now).await?;
        self.codes.insert_batch(&codes).await?;

        if let Some(coupon_id) = order.coupon_id {
            if let Err(e) = self.coupons.increment_uses(coupon_id).await {
                warn!(%coupon_id, error = %e, "failed to bump coupon usage");
            }
        }

        self.order_side_effects(&order, &codes).await;
        info!(%order_id, payment_id = %payment.id, count = codes.len(), "order paid, codes generated");
        Ok(WebhookAck::Processed)
    }

    /// One code per purchased session, retrying random generation on
    /// collision.
    async fn cut_session_codes(
        &self,
        order: &PackageOrder,
        package: &Package,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionCode>, EngineError> {
        let expires_at = now + Duration::days(package.validity_days);
        let mut codes = Vec::with_capacity(package.sessions as usize);

        for _ in 0..package.sessions {
            let code = self.unique_code(&codes).await?;
            codes.push(SessionCode {
                id: Uuid::new_v4(),
                code,
                order_id: order.id,
                payment_id: Some(payment_id.to_string()),
                applicable_service_ids: package.applicable_service_ids.clone(),
                buyer_email: order.buyer_email.clone(),
                purchased_at: now,
                expires_at,
                is_used: false,
                used_in_booking_id: None,
                used_at: None,
                gift_token: package.is_gift.then(|| random_token(24)),
            });
        }
        Ok(codes)
    }

    async fn unique_code(&self, pending: &[SessionCode]) -> Result<String, EngineError> {
        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let candidate = format!("{CODE_PREFIX}{}", random_token(CODE_LENGTH));
            if pending.iter().any(|c| c.code == candidate) {
                continue;
            }
            if !self.codes.code_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(EngineError::Internal("could not generate a unique session code".into()))
    }

    async fn booking_side_effects(&self, booking: &Booking) {
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

    async fn order_side_effects(&self, order: &PackageOrder, codes: &[SessionCode]) {
        if let Err(e) = self.notifier.codes_generated(order, codes).await {
            warn!(order_id = %order.id, error = %e, "code delivery notification failed");
        }
        if let Err(e) = self
            .notifier
            .crm_upsert(&order.buyer_email, serde_json::json!({ "last_order_id": order.id }))
            .await
        {
            warn!(error = %e, "crm upsert failed");
        }
    }
}

fn detail_of(payment: &GatewayPayment) -> &str {
    payment.status_detail.as_deref().unwrap_or("")
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}
