use thiserror::Error;

/// Error type repositories and external collaborators return, matching the
/// transport-agnostic boxed style used across the workspace seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Typed business-rule rejections. These are synchronous, carry no side
/// effects, and are safe to retry with different input but never as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Servicio no encontrado")]
    ServiceNotFound,

    #[error("Profesional no encontrado")]
    ProfessionalNotFound,

    #[error("Paquete no encontrado")]
    PackageNotFound,

    #[error("El código no existe")]
    CodeNotFound,

    #[error("El código ya fue utilizado")]
    CodeUsed,

    #[error("El código está vencido")]
    CodeExpired,

    #[error("El código no es válido para este servicio")]
    CodeNotApplicable,

    #[error("Cupón inválido: {0}")]
    CouponInvalid(String),

    #[error("No quedan cupos disponibles para este horario")]
    NoCapacity,

    #[error("El horario solicitado no está disponible")]
    InvalidSlot,

    #[error("Solicitud inválida: {0}")]
    Validation(String),
}

/// What an engine operation can fail with: a typed business rejection
/// (4xx, no state change) or an internal/dependency failure (5xx).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BoxError> for EngineError {
    fn from(err: BoxError) -> Self {
        EngineError::Internal(err.to_string())
    }
}

impl Rejection {
    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::ServiceNotFound => "SERVICE_NOT_FOUND",
            Rejection::ProfessionalNotFound => "PROFESSIONAL_NOT_FOUND",
            Rejection::PackageNotFound => "PACKAGE_NOT_FOUND",
            Rejection::CodeNotFound => "CODE_NOT_FOUND",
            Rejection::CodeUsed => "CODE_USED",
            Rejection::CodeExpired => "CODE_EXPIRED",
            Rejection::CodeNotApplicable => "CODE_NOT_APPLICABLE",
            Rejection::CouponInvalid(_) => "COUPON_INVALID",
            Rejection::NoCapacity => "NO_CAPACITY",
            Rejection::InvalidSlot => "INVALID_SLOT",
            Rejection::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
