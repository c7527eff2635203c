use std::sync::Arc;

use glaciar_booking::{BookingEngine, PackageService};
use glaciar_core::repository::{BookingRepository, OrderRepository};
use glaciar_payments::WebhookReconciler;
use glaciar_schedule::{AvailabilityService, Materializer};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub availability: Arc<AvailabilityService>,
    pub engine: Arc<BookingEngine>,
    pub packages: Arc<PackageService>,
    pub materializer: Arc<Materializer>,
    pub reconciler: Arc<WebhookReconciler>,
    pub bookings: Arc<dyn BookingRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub auth: AuthConfig,
    pub materialize_days_ahead: i64,
}
