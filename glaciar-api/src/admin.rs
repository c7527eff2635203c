use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use glaciar_core::timezone::studio_date;
use glaciar_schedule::MaterializeReport;

use crate::auth::require_admin;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct MaterializeBody {
    /// Explicit range wins over `days_ahead`.
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub days_ahead: Option<i64>,
    pub professional_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    booking_id: Uuid,
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/slots/materialize", post(materialize_slots))
        .route("/v1/admin/bookings/{id}/cancel", post(cancel_booking))
}

/// Runs the slot materializer from today (studio calendar) forward.
async fn materialize_slots(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
    Json(body): Json<MaterializeBody>,
) -> Result<Json<MaterializeReport>, AppError> {
    require_admin(&bearer, &state.auth.secret)?;

    let now = Utc::now();
    let (from, to) = match (body.date_from, body.date_to) {
        (Some(from), Some(to)) => {
            if to < from {
                return Err(AppError::ValidationError("date_to precedes date_from".into()));
            }
            (from, to)
        }
        _ => {
            let days = body.days_ahead.unwrap_or(state.materialize_days_ahead);
            if !(1..=365).contains(&days) {
                return Err(AppError::ValidationError("days_ahead must be in 1..=365".into()));
            }
            let from = studio_date(now);
            (from, from + Duration::days(days))
        }
    };

    let report = state
        .materializer
        .materialize(from, to, body.professional_id, body.service_id, now)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(report))
}

async fn cancel_booking(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    require_admin(&bearer, &state.auth.secret)?;

    state.engine.cancel_booking(id).await.map_err(AppError::from_engine)?;

    Ok(Json(CancelResponse { booking_id: id, status: "CANCELLED".to_string() }))
}
