//! Error types for the HTTP API.
//!
//! ```text
//! ValidationError / CoreError ──► ApiError::Validation   400
//! (bad or missing bearer token) ─► ApiError::Unauthorized 401
//! (token of the other role) ────► ApiError::Forbidden    403
//! DbError::NotFound ────────────► ApiError::NotFound     404
//! DbError::UniqueViolation ─────► ApiError::Conflict     409
//! DbError::ConnectionFailed ────► ApiError::Unavailable  503
//! anything else ────────────────► ApiError::Internal     500
//! ```
//!
//! Internal details are logged and replaced by a generic message unless
//! the server runs with `environment = development`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fieldsales_core::{CoreError, ValidationError};
use fieldsales_db::DbError;
use serde_json::json;
use tracing::{error, warn};

static EXPOSE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Whether 500 responses carry the underlying error message.
pub fn expose_internal_details(expose: bool) {
    EXPOSE_INTERNAL_DETAILS.store(expose, Ordering::Relaxed);
}

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Internal error");
                if EXPOSE_INTERNAL_DETAILS.load(Ordering::Relaxed) {
                    detail.clone()
                } else {
                    "Internal server error".to_string()
                }
            }
            ApiError::Unavailable(detail) => {
                warn!(error = %detail, "Database unavailable");
                "Database temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({ "error": self.code(), "message": message });
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => inner.into(),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, .. } => ApiError::NotFound(format!("{entity} not found")),
            DbError::UniqueViolation { field, .. } => {
                ApiError::Conflict(format!("A record with this {field} already exists"))
            }
            DbError::ForeignKeyViolation { .. } => {
                ApiError::Validation("Referenced record does not exist".to_string())
            }
            DbError::Conflict(msg) => ApiError::Conflict(msg),
            e if e.is_unavailable() => ApiError::Unavailable(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Validation(format!("Invalid multipart request: {err}"))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        assert_eq!(
            ApiError::from(DbError::not_found("Sale", "x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::duplicate("contactNo", "1")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DbError::PoolExhausted).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(DbError::QueryFailed("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_error_is_bad_request() {
        let err = CoreError::AmountMismatch { amount: 1, expected: 2 };
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
        let err = ValidationError::required("retailer");
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
    }
}
