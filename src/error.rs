//! # Service Errors
//!
//! Error taxonomy shared by the stores, the service layer and the HTTP handlers.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::bookings::BookingConflict;

/// Result type for service operations
pub type AppResult<T> = Result<T, AppError>;

/// Message returned to clients in place of backend detail
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Error)]
pub enum AppError {
    // ==================
    // Domain Errors
    // ==================
    /// Missing or malformed request fields
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Name or hood number already taken
    #[error("{0}")]
    Duplicate(String),

    /// Unknown user, hood or id
    #[error("{0}")]
    NotFound(String),

    /// Identity does not match the record being touched
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Double booking at the same instant
    #[error("Booking failed: {0}")]
    Conflict(BookingConflict),

    // ==================
    // Authentication Errors
    // ==================
    /// Unknown name or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No session token was presented
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Session token unknown, revoked or expired
    #[error("Session expired or invalid")]
    SessionInvalid,

    // ==================
    // Internal Errors
    // ==================
    /// Storage or hashing failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Duplicate(_)
            | AppError::NotFound(_)
            | AppError::Permission(_)
            | AppError::Conflict(_)
            | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,

            AppError::AuthenticationRequired | AppError::SessionInvalid => {
                StatusCode::UNAUTHORIZED
            }

            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller caused this error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to hand back to the caller
    pub fn client_message(&self) -> String {
        match self {
            AppError::Backend(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn lock_poisoned() -> Self {
        AppError::Backend("Lock poisoned".to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Backend(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.client_message(),
            code: err.status_code().as_u16(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::warn!(error = %self, "request rejected");
        } else {
            tracing::error!(error = %self, "request failed");
        }

        (self.status_code(), Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict(BookingConflict::HoodAlreadyBooked { hood_number: 101 })
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Backend("db down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_detail_not_exposed() {
        let err = AppError::Backend("connection refused to 10.0.0.4:5432".into());
        let body = ErrorResponse::from(&err);

        assert_eq!(body.error, "Internal server error");
        assert_eq!(body.code, 500);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_invalid_credentials_is_generic() {
        let message = AppError::InvalidCredentials.to_string();
        assert!(!message.contains("password"));
        assert!(!message.contains("name"));
    }
}
