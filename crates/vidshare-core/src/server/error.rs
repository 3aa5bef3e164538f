//! HTTP error responses for the file server.
//!
//! Errors that happen before a response body starts are rendered as a JSON
//! body with a matching status code.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// HTTP status sent with the body
    #[serde(skip)]
    pub status: StatusCode,
    /// Error code (e.g., "E001" for a missing file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Total resource size, for `416` responses
    #[serde(skip)]
    unsatisfied_size: Option<u64>,
}

impl ApiError {
    /// Create an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            details: None,
            unsatisfied_size: None,
        }
    }

    /// Add details to the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create an internal server error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Create a `416 Range Not Satisfiable` error for a resource of `size` bytes.
    #[must_use]
    pub fn range_not_satisfiable(size: u64) -> Self {
        Self {
            unsatisfied_size: Some(size),
            ..Self::new(
                StatusCode::RANGE_NOT_SATISFIABLE,
                format!("requested range is outside 0-{}", size.saturating_sub(1)),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let unsatisfied_size = self.unsatisfied_size;
        let mut response = (status, Json(self)).into_response();

        if let Some(size) = unsatisfied_size {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        let status = match &err {
            crate::error::Error::FileNotFound(_) | crate::error::Error::ShareNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            code: err.code().map(String::from),
            ..Self::new(status, err.to_string())
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {err}"))
    }
}

/// Result type for server handlers.
pub type ApiResult<T> = Result<T, ApiError>;
