//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! mapping onto the JSON failure envelope `{status, message}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;
use household_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core
    /// service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a
    /// network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed client input.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity absent, or not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// No valid caller identity attached to the request.
    #[error("Unauthorized")]
    Unauthorized,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

/// A convenience alias used by every handler.
pub type ApiResult<T> = Result<T, ApiError>;

/// The wire shape of every failure response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Port(PortError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Port(PortError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            other => {
                error!("request failed: {other:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected server error.".to_string(),
                )
            }
        };

        let body = ErrorBody {
            status: code.as_u16(),
            message,
        };
        (code, Json(body)).into_response()
    }
}
