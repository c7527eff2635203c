use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use glaciar_core::{EngineError, Rejection};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    Rejected(Rejection),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// Engine rejections become 4xx with a stable code; anything internal
    /// is a 500.
    pub fn from_engine(err: EngineError) -> Self {
        match err {
            EngineError::Rejected(rejection) => AppError::Rejected(rejection),
            EngineError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

fn rejection_status(rejection: &Rejection) -> StatusCode {
    match rejection {
        Rejection::ServiceNotFound
        | Rejection::ProfessionalNotFound
        | Rejection::PackageNotFound
        | Rejection::CodeNotFound => StatusCode::NOT_FOUND,
        Rejection::NoCapacity => StatusCode::CONFLICT,
        Rejection::CodeUsed
        | Rejection::CodeExpired
        | Rejection::CodeNotApplicable
        | Rejection::CouponInvalid(_)
        | Rejection::InvalidSlot => StatusCode::UNPROCESSABLE_ENTITY,
        Rejection::Validation(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Rejected(rejection) => (
                rejection_status(&rejection),
                json!({ "error": rejection.to_string(), "code": rejection.code() }),
            ),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
