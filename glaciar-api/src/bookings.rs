use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use glaciar_booking::CreateBookingRequest;
use glaciar_core::booking::Customer;
use glaciar_payments::status_text::booking_status_message;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub customer: CustomerBody,
    pub coupon_code: Option<String>,
    pub session_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerBody {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    status: String,
    init_point: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingStatusResponse {
    booking_id: Uuid,
    status: String,
    message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}/status", get(booking_status))
}

fn validate(body: &CreateBookingBody) -> Result<(), AppError> {
    if body.customer.name.trim().is_empty() {
        return Err(AppError::ValidationError("customer name is required".into()));
    }
    if !body.customer.email.contains('@') {
        return Err(AppError::ValidationError("a valid email is required".into()));
    }
    if body.coupon_code.is_some() && body.session_code.is_some() {
        return Err(AppError::ValidationError(
            "a booking takes either a coupon or a session code, not both".into(),
        ));
    }
    Ok(())
}

async fn create_booking(
    State(state): State<AppState>,
    Json(body): Json<CreateBookingBody>,
) -> Result<Json<BookingResponse>, AppError> {
    validate(&body)?;

    let outcome = state
        .engine
        .create_booking(
            CreateBookingRequest {
                professional_id: body.professional_id,
                service_id: body.service_id,
                start_at: body.start_at,
                customer: Customer {
                    name: body.customer.name,
                    email: body.customer.email,
                    phone: body.customer.phone,
                },
                coupon_code: body.coupon_code,
                session_code: body.session_code,
            },
            Utc::now(),
        )
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(BookingResponse {
        booking_id: outcome.booking_id,
        status: outcome.status.as_str().to_string(),
        init_point: outcome.init_point,
    }))
}

/// Public polling endpoint the post-checkout page uses.
async fn booking_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingStatusResponse>, AppError> {
    let booking = state
        .bookings
        .get(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Reserva no encontrada".into()))?;

    Ok(Json(BookingStatusResponse {
        booking_id: booking.id,
        status: booking.status.as_str().to_string(),
        message: booking_status_message(booking.status, booking.status_detail.as_deref()),
    }))
}
