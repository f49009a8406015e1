//! Client-facing error responses.
//!
//! # Responsibilities
//! - Render every pre-commit failure as `{"error": <message>}`
//! - Pick the status: input errors 4xx, upstream status when known, else 500
//!
//! # Design Decisions
//! - Once streaming headers are out nothing passes through here; the relay
//!   task only logs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::forward::ForwardError;

/// A JSON error body with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}
