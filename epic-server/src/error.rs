//! Error types for epic-server
//!
//! Every handler returns [`ApiResult`]; errors render as
//! `{"error": {"code": ..., "message": ..., "details": ...}}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use epic_common::api::ErrorResponse;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::report::ReportError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// One message per invalid field or row (400)
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// epic-common error
    #[error("Common error: {0}")]
    Common(#[from] epic_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
            ApiError::Database(err) => database_error_parts(err),
            ApiError::Common(epic_common::Error::Database(err)) => database_error_parts(err),
            ApiError::Common(epic_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            ApiError::Common(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::ProgramNotFound(id) => ApiError::NotFound(format!("Program {}", id)),
            ReportError::Database(e) => ApiError::Database(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Constraint violations are the client's fault; anything else is ours
fn database_error_parts(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => (
            StatusCode::BAD_REQUEST,
            "CONFLICT",
            "A record with these values already exists".to_string(),
        ),
        Some(db_err) if db_err.is_foreign_key_violation() => (
            StatusCode::BAD_REQUEST,
            "INVALID_REFERENCE",
            "Referenced record does not exist".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "DATABASE_ERROR",
            err.to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            error!("{}", self);
        }

        let body = match self {
            ApiError::Validation(messages) => {
                ErrorResponse::with_details(code, message, json!(messages))
            }
            _ => ErrorResponse::new(code, message),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
