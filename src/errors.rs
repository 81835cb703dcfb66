//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.
//!
//! Errors are either *operational* (anticipated, carry a status code and a
//! message that is safe to show to clients) or uncategorised faults coming
//! from the database, the token library, the voice provider or a bug.
//! [`AppError::classify`] folds the known fault shapes into operational
//! errors before rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use sea_orm::SqlErr;
use serde::Serialize;
use thiserror::Error;

/// Message shown for faults that must not leak details.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Anticipated error, safe to surface to the client as-is.
    #[error("{message}")]
    Operational { status: StatusCode, message: String },

    // External service errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    // Internal
    #[error("{0}")]
    Internal(String),
}

/// Failure body: `{status, message}`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

/// Attached to every error response so the terminal error middleware can log
/// the fault and decide how much detail to expose.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub operational: bool,
    /// Message of the classified error (the real one, even when hidden).
    pub message: String,
    /// Debug rendering of the original fault.
    pub detail: String,
}

impl AppError {
    /// Fold known fault shapes into operational errors.
    pub fn classify(self) -> Self {
        match self {
            AppError::Database(ref err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(
                    "Duplicate field value. Please use another value.",
                ),
                _ => self,
            },
            AppError::Jwt(ref err) => match err.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Your token has expired. Please log in again.")
                }
                _ => AppError::unauthorized("Invalid token. Please log in again."),
            },
            other => other,
        }
    }

    /// Whether the error is anticipated and its message safe to show.
    pub fn is_operational(&self) -> bool {
        matches!(self, AppError::Operational { .. })
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Operational { status, .. } => *status,
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `"fail"` for client errors, `"error"` for everything else.
    pub fn status_label(&self) -> &'static str {
        status_label(self.status())
    }
}

/// `"fail"` for 4xx codes, `"error"` otherwise.
pub fn status_label(status: StatusCode) -> &'static str {
    if status.is_client_error() {
        "fail"
    } else {
        "error"
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = format!("{:?}", self);
        let error = self.classify();
        let status = error.status();
        let operational = error.is_operational();
        let message = error.to_string();

        let body = ErrorResponse {
            status: status_label(status),
            message: if operational {
                message.clone()
            } else {
                GENERIC_ERROR_MESSAGE.to_string()
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorReport {
            status,
            operational,
            message,
            detail,
        });
        response
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(message))
    }
}

/// Convenience constructors
impl AppError {
    pub fn operational(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Operational {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::bad_request(msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::operational(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
