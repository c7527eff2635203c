use std::net::SocketAddr;
use std::sync::Arc;

use glaciar_api::{app, state::{AppState, AuthConfig}};
use glaciar_booking::{BookingEngine, CheckoutUrls, PackageService};
use glaciar_core::notify::NoopNotifier;
use glaciar_payments::{MercadoPagoClient, WebhookReconciler};
use glaciar_schedule::{AvailabilityService, Materializer};
use glaciar_store::{
    DbClient, StoreBookingRepository, StoreCatalogRepository, StoreCouponRepository,
    StoreOrderRepository, StoreScheduleRepository, StoreSessionCodeRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glaciar_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = glaciar_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Glaciar API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let catalog = Arc::new(StoreCatalogRepository::new(db.pool.clone()));
    let schedule = Arc::new(StoreScheduleRepository::new(db.pool.clone()));
    let bookings = Arc::new(StoreBookingRepository::new(db.pool.clone()));
    let orders = Arc::new(StoreOrderRepository::new(db.pool.clone()));
    let codes = Arc::new(StoreSessionCodeRepository::new(db.pool.clone()));
    let coupons = Arc::new(StoreCouponRepository::new(db.pool.clone()));

    let gateway = Arc::new(MercadoPagoClient::new(
        config.gateway.base_url.clone(),
        config.gateway.access_token.clone(),
    ));
    let notifier = Arc::new(NoopNotifier);

    let urls = CheckoutUrls {
        success: config.checkout.success_url.clone(),
        failure: config.checkout.failure_url.clone(),
        pending: config.checkout.pending_url.clone(),
        notification: config.checkout.notification_url.clone(),
    };

    let engine = Arc::new(BookingEngine::new(
        catalog.clone(),
        schedule.clone(),
        bookings.clone(),
        codes.clone(),
        coupons.clone(),
        gateway.clone(),
        notifier.clone(),
        urls.clone(),
    ));
    let packages = Arc::new(PackageService::new(
        catalog.clone(),
        orders.clone(),
        coupons.clone(),
        gateway.clone(),
        urls,
    ));
    let reconciler = Arc::new(WebhookReconciler::new(
        gateway,
        bookings.clone(),
        orders.clone(),
        codes,
        coupons,
        schedule.clone(),
        catalog.clone(),
        notifier,
        config.gateway.webhook_secret.clone(),
    ));

    let app_state = AppState {
        availability: Arc::new(AvailabilityService::new(schedule.clone(), catalog.clone())),
        engine,
        packages,
        materializer: Arc::new(Materializer::new(schedule, catalog)),
        reconciler,
        bookings,
        orders,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        materialize_days_ahead: config.schedule.materialize_days_ahead,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
