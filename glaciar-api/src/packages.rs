use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use glaciar_booking::PurchasePackageRequest;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
    pub package_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct PurchaseResponse {
    order_id: Uuid,
    init_point: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeBody {
    pub code: String,
    pub service_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ValidateCodeResponse {
    valid: bool,
    code_id: Uuid,
    expires_at: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/packages", post(purchase_package))
        .route("/v1/session-codes/validate", post(validate_code))
}

async fn purchase_package(
    State(state): State<AppState>,
    Json(body): Json<PurchaseBody>,
) -> Result<Json<PurchaseResponse>, AppError> {
    if body.buyer_name.trim().is_empty() {
        return Err(AppError::ValidationError("buyer name is required".into()));
    }
    if !body.buyer_email.contains('@') {
        return Err(AppError::ValidationError("a valid email is required".into()));
    }

    let outcome = state
        .packages
        .purchase(
            PurchasePackageRequest {
                package_id: body.package_id,
                buyer_name: body.buyer_name,
                buyer_email: body.buyer_email,
                buyer_phone: body.buyer_phone,
                coupon_code: body.coupon_code,
            },
            Utc::now(),
        )
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(PurchaseResponse {
        order_id: outcome.order_id,
        init_point: outcome.init_point,
    }))
}

/// Pre-flight check the booking form runs before submitting a session code.
/// Read-only: the code is only consumed when the booking is created.
async fn validate_code(
    State(state): State<AppState>,
    Json(body): Json<ValidateCodeBody>,
) -> Result<Json<ValidateCodeResponse>, AppError> {
    let code = state
        .engine
        .validate_code(&body.code, body.service_id, Utc::now())
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(ValidateCodeResponse {
        valid: true,
        code_id: code.id,
        expires_at: code.expires_at,
    }))
}
