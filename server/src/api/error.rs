//! API Error Types
//!
//! The single error taxonomy every handler surfaces: validation,
//! authentication, authorization, not-found, conflict and database errors,
//! rendered as structured JSON. Nothing is silently recovered.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error taxonomy.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (bad pagination bounds, bad slug, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No valid session where one is required.
    #[error("Authentication required")]
    Unauthenticated,

    /// Login with wrong credentials.
    #[error("Wrong credentials")]
    WrongCredentials,

    /// Logout without a session.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Actor is known but not allowed to perform the operation.
    #[error("Permission denied")]
    Forbidden,

    /// Unknown id or slug.
    #[error("Not found: {0}")]
    NotFound(&'static str),

    /// Uniqueness violation or protected delete.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Password hashing error.
    #[error("Password processing failed")]
    PasswordHash,

    /// Database error.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            // Login/logout failures are 403-class, matching the session
            // endpoints' contract.
            Self::WrongCredentials => (StatusCode::FORBIDDEN, "WRONG_CREDENTIALS"),
            Self::NotLoggedIn => (StatusCode::FORBIDDEN, "NOT_LOGGED_IN"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
