use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use glaciar_payments::status_text::order_status_message;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct OrderStatusResponse {
    order_id: Uuid,
    status: String,
    message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/orders/{id}/status", get(order_status))
}

/// Public polling endpoint. Exposes a sanitized message, never the raw
/// gateway detail.
async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderStatusResponse>, AppError> {
    let order = state
        .orders
        .get(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Compra no encontrada".into()))?;

    Ok(Json(OrderStatusResponse {
        order_id: order.id,
        status: order.status.as_str().to_string(),
        message: order_status_message(order.status, order.status_detail.as_deref()),
    }))
}
