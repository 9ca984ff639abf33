//! API response types
//!
//! Every error leaves the API as `{"error": "<message>"}`. Server-side failures
//! always carry the same generic message; the cause is logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Standard error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(INTERNAL_ERROR_MESSAGE)
    }

    /// Pair the body with a status code
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }

    pub fn bad_request(message: impl Into<String>) -> Response {
        Self::new(message).with_status(StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Response {
        Self::new(message).with_status(StatusCode::NOT_FOUND)
    }

    pub fn internal_server_error() -> Response {
        Self::internal().with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
