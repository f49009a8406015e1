//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardRequest
//!     → upstream.rs (build POST: target, headers, JSON data)
//!     → stream flag?
//!         false → buffered.rs  (read whole body, 30s deadline)
//!         true  → streaming.rs (relay.rs loop, decoder.rs per chunk)
//!     → Response, or ForwardError for the error responder
//! ```
//!
//! # Design Decisions
//! - No retries; every failure surfaces once
//! - One shared reqwest client; pooling is whatever reqwest provides
//! - Streaming has no overall deadline, only the connect timeout

pub mod buffered;
pub mod decoder;
pub mod error;
pub mod relay;
pub mod streaming;
pub mod upstream;

use std::time::Duration;

use axum::response::Response;

pub use error::ForwardError;

use crate::config::ForwardConfig;
use crate::http::request::ForwardRequest;

/// How the upstream body is relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Buffered,
    Streaming,
}

impl Mode {
    pub fn of(request: &ForwardRequest) -> Self {
        if request.stream {
            Mode::Streaming
        } else {
            Mode::Buffered
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Buffered => "buffered",
            Mode::Streaming => "streaming",
        }
    }
}

/// Forward `request` in the mode it asks for.
pub async fn forward(
    client: &reqwest::Client,
    config: &ForwardConfig,
    request: &ForwardRequest,
    request_id: &str,
) -> Result<Response, ForwardError> {
    match Mode::of(request) {
        Mode::Buffered => {
            let timeout = Duration::from_secs(config.buffered_timeout_secs);
            buffered::forward(client, request, timeout, request_id).await
        }
        Mode::Streaming => {
            let delay = Duration::from_millis(config.chunk_delay_ms);
            streaming::forward(client, request, delay, request_id).await
        }
    }
}
