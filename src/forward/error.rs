//! Forwarding error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can stop a forward before the client response is committed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// `target` absent, null, or blank.
    #[error("Target URL is required")]
    MissingTarget,

    /// Body is not a JSON object of the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// `target` is not an absolute http(s) URL.
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    /// A caller-supplied header cannot be sent upstream.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Upstream could not be reached (DNS, refused, timeout, ...).
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    /// Upstream answered but its body could not be read.
    #[error("{source}")]
    UpstreamBody {
        status: StatusCode,
        #[source]
        source: reqwest::Error,
    },
}

impl ForwardError {
    /// Status code the client receives for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::MissingTarget
            | ForwardError::InvalidBody(_)
            | ForwardError::InvalidTarget(_)
            | ForwardError::InvalidHeader { .. } => StatusCode::BAD_REQUEST,
            ForwardError::Upstream(e) => e.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ForwardError::UpstreamBody { status, .. } => {
                if status.is_client_error() || status.is_server_error() {
                    *status
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }
}
