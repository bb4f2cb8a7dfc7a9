//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type. Each variant maps to one HTTP
//! status and a JSON body of the form `{ "error": "<message>" }`. Server-side
//! failures are logged in full and reported to the client generically.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::persistence::StoreError;

/// JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// | Variant           | HTTP Status               |
/// |-------------------|---------------------------|
/// | `InvalidInput`    | 400 Bad Request           |
/// | `NotFound`        | 404 Not Found             |
/// | `Conflict`        | 409 Conflict              |
/// | `DataUnavailable` | 500 Internal Server Error |
/// | `Computation`     | 500 Internal Server Error |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Request parameters failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The write conflicts with current catalog state.
    #[error("{0}")]
    Conflict(String),

    /// The data store could not be reached or returned unusable data.
    /// Retryable by the caller.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Unexpected failure while computing a result.
    #[error("computation failed: {0}")]
    Computation(String),
}

impl ServiceError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DataUnavailable(_) | Self::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::DataUnavailable(_) => "data store unavailable, retry later".to_string(),
            Self::Computation(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Unavailable(_) | StoreError::Malformed(_) => {
                Self::DataUnavailable(err.to_string())
            }
        }
    }
}

// Body and query rejections are client errors whatever status axum picked.
impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, axum::Json(body)).into_response()
    }
}
