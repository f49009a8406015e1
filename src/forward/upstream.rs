//! Upstream HTTP client and request construction.

use std::time::Duration;

use axum::http::header::{self, HeaderName};
use reqwest::{Client, RequestBuilder};

use crate::config::ForwardConfig;
use crate::http::request::ForwardRequest;

/// Caller headers that describe the inbound body rather than the one we send.
const BODY_FRAMING_HEADERS: [HeaderName; 2] = [header::CONTENT_LENGTH, header::TRANSFER_ENCODING];

/// Build the shared upstream client.
///
/// No overall timeout is set here; the buffered path applies its own
/// per-request deadline and the streaming path runs without one.
pub fn build_client(config: &ForwardConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
}

/// Prepare the upstream POST for a forwarding request.
///
/// Caller headers go out verbatim except body framing, which the client
/// recomputes for the re-encoded body. `Content-Type: application/json` is
/// only added when the caller did not choose one.
pub fn build_request(client: &Client, request: &ForwardRequest) -> RequestBuilder {
    let mut headers = request.headers.clone();
    for name in BODY_FRAMING_HEADERS {
        headers.remove(name);
    }

    let builder = client.post(request.target.clone()).headers(headers);
    match &request.data {
        Some(data) => builder.json(data),
        None => builder,
    }
}
