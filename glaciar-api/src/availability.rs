use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use glaciar_core::schedule::AvailableSlot;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub professional_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/availability", get(get_availability))
}

/// GET /v1/availability?date=2026-03-16&professional_id=...
async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailableSlot>>, AppError> {
    let slots = state
        .availability
        .get_availability(query.date, query.professional_id, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(slots))
}
