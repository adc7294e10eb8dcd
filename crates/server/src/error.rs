//! HTTP error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`; persistence and domain
//! failures are translated here so nothing crosses the HTTP boundary
//! unhandled. The body is always the `{"error": ...}` envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use studyflow_api_types::ErrorResponse;
use studyflow_core::domain::{Denied, DomainError};
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// 400: missing/malformed input, numeric-range violations.
    Validation(String),
    /// 401: missing/invalid/expired token, bad credentials.
    Authentication(String),
    /// 403: role/ownership denial.
    Authorization(String),
    /// 404: resource id does not resolve.
    NotFound(String),
    /// 409: unique-constraint violation.
    Conflict(String),
    /// 500: logged server-side, generic message to the client.
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// The message a client would see for this error. Batch endpoints use
    /// this to report per-item failures without leaking internals.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message)
            | Self::Authentication(message)
            | Self::Authorization(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => message.clone(),
            Self::Internal(_) => "Internal server error.".to_string(),
        }
    }

    /// Maps a persistence failure, turning constraint violations into 409
    /// with a resource-specific message. Foreign-key violations land here
    /// too: the store blocking a delete while dependents exist is reported
    /// as a conflict, not a server fault.
    pub fn db(err: DbErr, conflict_message: &str) -> Self {
        if Self::is_constraint_violation(&err) {
            return Self::Conflict(conflict_message.to_string());
        }
        Self::Internal(err.into())
    }

    /// SQLite reports foreign-key failures as a plain execution error that
    /// `sql_err()` leaves unclassified, so the message is checked as well.
    fn is_constraint_violation(err: &DbErr) -> bool {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_))
            | Some(SqlErr::ForeignKeyConstraintViolation(_)) => true,
            _ => {
                matches!(err, DbErr::Exec(_) | DbErr::Query(_))
                    && err.to_string().contains("FOREIGN KEY constraint failed")
            }
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::Internal(err.into())
    }
}

impl From<Denied> for ApiError {
    fn from(denial: Denied) -> Self {
        Self::Authorization(denial.0)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Authentication(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Authorization(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(err) => {
                error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
