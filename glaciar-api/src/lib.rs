use axum::{http::Method, routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod error;
pub mod orders;
pub mod packages;
pub mod state;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/health", get(health))
        .merge(availability::routes())
        .merge(bookings::routes())
        .merge(packages::routes())
        .merge(orders::routes())
        .merge(admin::routes())
        .merge(webhooks::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use glaciar_booking::{BookingEngine, CheckoutUrls, PackageService};
    use glaciar_core::notify::NoopNotifier;
    use glaciar_core::schedule::GeneratedSlot;
    use glaciar_core::testing::{FakeGateway, MemoryStore};
    use glaciar_payments::WebhookReconciler;
    use glaciar_schedule::{AvailabilityService, Materializer};

    use crate::state::{AppState, AuthConfig};

    fn urls() -> CheckoutUrls {
        CheckoutUrls {
            success: "https://studio.cl/pago/ok".into(),
            failure: "https://studio.cl/pago/error".into(),
            pending: "https://studio.cl/pago/pendiente".into(),
            notification: "https://studio.cl/api/webhooks/payments".into(),
        }
    }

    fn test_state(store: Arc<MemoryStore>) -> AppState {
        let gateway = Arc::new(FakeGateway::default());
        let notifier = Arc::new(NoopNotifier);

        let engine = Arc::new(BookingEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            notifier.clone(),
            urls(),
        ));
        let packages = Arc::new(PackageService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            urls(),
        ));
        let reconciler = Arc::new(WebhookReconciler::new(
            gateway,
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifier,
            None,
        ));

        AppState {
            availability: Arc::new(AvailabilityService::new(store.clone(), store.clone())),
            engine,
            packages,
            materializer: Arc::new(Materializer::new(store.clone(), store.clone())),
            reconciler,
            bookings: store.clone(),
            orders: store,
            auth: AuthConfig { secret: "s3cret".into(), expiration: 3600 },
            materialize_days_ahead: 60,
        }
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let app = app(test_state(Arc::new(MemoryStore::default())));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn availability_returns_persisted_slots() {
        let store = Arc::new(MemoryStore::default());
        let start = Utc::now() + Duration::days(2);
        store.with_slot(GeneratedSlot {
            id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            start_at: start,
            end_at: start + Duration::minutes(60),
            max_capacity: 5,
            confirmed_bookings: 1,
            is_active: true,
        });
        let date = glaciar_core::timezone::studio_date(start);
        let app = app(test_state(store));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/availability?date={date}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let slots: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0]["available_capacity"], 4);
    }

    #[tokio::test]
    async fn webhook_without_payment_id_is_acknowledged() {
        let app = app(test_state(Arc::new(MemoryStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/webhooks/payments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_materialize_rejects_non_admin_token() {
        let app = app(test_state(Arc::new(MemoryStore::default())));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/admin/slots/materialize")
                    .header("authorization", "Bearer not-a-token")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
