//! Streaming (incremental) forwarding.
//!
//! ```text
//! OPEN_UPSTREAM
//!     → non-2xx: read error body → RESPOND_AND_STOP
//!     → 2xx:     send headers, spawn relay → CLOSE
//! ```

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::forward::relay::{relay, ChannelSink, RelayEnd};
use crate::forward::upstream::build_request;
use crate::forward::ForwardError;
use crate::http::request::ForwardRequest;
use crate::observability::metrics;

/// Hint for nginx-style intermediaries not to buffer the response.
pub const X_ACCEL_BUFFERING: &str = "x-accel-buffering";

/// Open the upstream and start relaying its body.
///
/// Returns once headers are decided; the body keeps flowing from a spawned
/// relay task. Errors after that point are logged by the task only.
pub async fn forward(
    client: &reqwest::Client,
    request: &ForwardRequest,
    chunk_delay: Duration,
    request_id: &str,
) -> Result<Response, ForwardError> {
    let upstream = build_request(client, request).send().await?;
    let status = upstream.status();

    if !status.is_success() {
        let body = upstream.bytes().await.unwrap_or_default();
        tracing::warn!(
            request_id = %request_id,
            status = %status,
            "Upstream rejected streaming request"
        );
        return Ok((status, Json(error_body(&body))).into_response());
    }

    tracing::debug!(
        request_id = %request_id,
        content_type = ?upstream.headers().get(header::CONTENT_TYPE),
        "Upstream stream opened"
    );

    let (sink, body) = ChannelSink::channel();
    let span = tracing::info_span!("relay", request_id = %request_id);
    let started = Instant::now();
    tokio::spawn(
        async move {
            let outcome = relay(upstream.bytes_stream(), sink, chunk_delay).await;
            match outcome.end {
                RelayEnd::Completed => tracing::debug!(
                    chunks = outcome.chunks,
                    bytes = outcome.bytes,
                    "Stream relayed"
                ),
                RelayEnd::UpstreamFailed | RelayEnd::ClientGone => tracing::warn!(
                    end = ?outcome.end,
                    chunks = outcome.chunks,
                    bytes = outcome.bytes,
                    "Stream closed early"
                ),
            }
            metrics::record_stream_finished(started);
        }
        .instrument(span),
    );

    Ok(stream_response(body))
}

/// Best-effort JSON parse of an upstream error body; `{}` when it is not JSON.
pub fn error_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Wrap a relayed body in the streaming response headers.
pub fn stream_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    response
}
