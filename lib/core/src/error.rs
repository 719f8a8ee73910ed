use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these —
// never on the human-readable message string.

/// Stable error code constants.
///
/// Clients should match on `code` from `{"code": "NOT_FOUND", "message": "..."}`.
/// Codes never change; messages may be reworded.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_STATE: &str = "INVALID_STATE";
    pub const INSUFFICIENT_STOCK: &str = "INSUFFICIENT_STOCK";
    pub const OVER_RECEIVED: &str = "OVER_RECEIVED";
    pub const OVER_ALLOCATION: &str = "OVER_ALLOCATION";
    pub const INTERNAL: &str = "INTERNAL";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "INSUFFICIENT_STOCK", "message": "variant 'v1': need 50, have 30"}
/// ```
///
/// Every failure is per-operation and recoverable: callers retry with
/// corrected input after the enclosing transaction has rolled back.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Referenced batch/task/variant does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate key / resource already exists. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Caller-supplied data fails a domain rule. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Operation attempted from a status that does not permit it. HTTP 409.
    #[error("{0}")]
    InvalidState(String),

    /// Material deduction would drive stock negative. HTTP 409.
    #[error("{0}")]
    InsufficientStock(String),

    /// Recorded completed+reject would exceed the pieces a stage received.
    /// HTTP 422.
    #[error("{0}")]
    OverReceived(String),

    /// Sub-batch split would assign more pieces than remain unassigned for a
    /// size/color. HTTP 422.
    #[error("{0}")]
    OverAllocation(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::ALREADY_EXISTS,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::InvalidState(_) => error_code::INVALID_STATE,
            ServiceError::InsufficientStock(_) => error_code::INSUFFICIENT_STOCK,
            ServiceError::OverReceived(_) => error_code::OVER_RECEIVED,
            ServiceError::OverAllocation(_) => error_code::OVER_ALLOCATION,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::InsufficientStock(_) => StatusCode::CONFLICT,
            ServiceError::OverReceived(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::OverAllocation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ServiceError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::InvalidState("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::OverReceived("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::OverAllocation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ServiceError::Storage("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ServiceError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(ServiceError::InvalidState("x".into()).error_code(), "INVALID_STATE");
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).error_code(),
            "INSUFFICIENT_STOCK"
        );
        assert_eq!(ServiceError::OverReceived("x".into()).error_code(), "OVER_RECEIVED");
        assert_eq!(ServiceError::OverAllocation("x".into()).error_code(), "OVER_ALLOCATION");
        assert_eq!(ServiceError::Validation("x".into()).error_code(), "VALIDATION_FAILED");
        assert_eq!(ServiceError::Storage("x".into()).error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn error_display_is_just_message() {
        assert_eq!(
            ServiceError::InsufficientStock("need 50, have 30".into()).to_string(),
            "need 50, have 30"
        );
        assert_eq!(ServiceError::NotFound("batch b1".into()).to_string(), "batch b1");
    }

    #[test]
    fn json_response_format() {
        let err = ServiceError::OverAllocation("110 > 100".into());
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
