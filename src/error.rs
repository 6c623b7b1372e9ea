use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Crate-wide error type. Every core operation returns `Result<T>` with this as `E`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("state machine error: {0}")]
    StateMachine(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("external provider error: {0}")]
    ExternalProvider(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Returns the stable string code surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::StateMachine(_) => "STATE_MACHINE_ERROR",
            AppError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            AppError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::ExternalProvider(_) => "EXTERNAL_PROVIDER_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Redis(_) => "CACHE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StateMachine(_) => StatusCode::CONFLICT,
            AppError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InsufficientBalance(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ExternalProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for errors that represent detected data corruption rather than an
    /// expected control-flow outcome. Callers should log at `error!` and bump the
    /// invariant-violation counter before returning these, never recover silently.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AppError::InvariantViolation(_))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Builds an `InvariantViolation` while escalating it immediately (§7): a
/// critical log plus the `invariant_violation` counter, at the point of
/// detection rather than wherever the error happens to surface. This is the
/// only way `AppError::InvariantViolation` should be constructed in the
/// codebase — both the HTTP path (handlers convert it via `IntoResponse`) and
/// the event-consumer path (which never touches `IntoResponse`) go through
/// this, so neither can silently recover from one.
pub fn invariant_violation(context: impl Into<String>) -> AppError {
    let context = context.into();
    tracing::error!(context = %context, "invariant violation detected");
    crate::observability::metrics::get_metrics().record_invariant_violation(&context);
    AppError::InvariantViolation(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_validation_to_400() {
        let err = AppError::Validation("amount must be positive".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn maps_state_machine_to_409() {
        let err = AppError::StateMachine("goal is not OPEN".into());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn maps_invariant_violation_to_422_and_flags_itself() {
        let err = AppError::InvariantViolation("unbalanced transaction".into());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn maps_unauthorized_to_401() {
        let err = AppError::Unauthorized("signature mismatch".into());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
