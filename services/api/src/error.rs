//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto HTTP responses. Every failure a handler can produce is folded into
//! this taxonomy and rendered as a JSON body of the shape
//! `{ "error": "<message>" }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use tutoring_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input (HTTP 400).
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer token (HTTP 401).
    #[error("{0}")]
    Auth(String),

    /// Role or ownership mismatch (HTTP 403).
    #[error("{0}")]
    Forbidden(String),

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email, double-accept, double-complete (HTTP 409).
    #[error("{0}")]
    Conflict(String),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g. binding a socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors (HTTP 500).
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => ApiError::NotFound(msg),
            PortError::Conflict(msg) => ApiError::Conflict(msg),
            PortError::Unauthorized => ApiError::Forbidden("Not allowed".to_string()),
            PortError::Unexpected(msg) => ApiError::Internal(msg),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log; the client sees a generic message.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {:?}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
