//! Buffered (single-shot) forwarding.
//!
//! The upstream body is read completely before the client sees any byte.

use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::IgnoredAny;
use serde_json::Value;

use crate::forward::ForwardError;
use crate::forward::upstream::build_request;
use crate::http::request::ForwardRequest;

/// Forward `request` and relay the upstream status and JSON body verbatim.
pub async fn forward(
    client: &reqwest::Client,
    request: &ForwardRequest,
    timeout: Duration,
    request_id: &str,
) -> Result<Response, ForwardError> {
    let response = build_request(client, request)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| ForwardError::UpstreamBody { status, source })?;

    tracing::debug!(
        request_id = %request_id,
        status = %status,
        bytes = body.len(),
        "Upstream responded"
    );

    Ok(relay_body(status, body))
}

/// Build the client response for an upstream body.
///
/// Well-formed JSON goes out byte for byte. Anything else is wrapped through
/// [`decode_body`].
fn relay_body(status: StatusCode, body: Bytes) -> Response {
    if !body.is_empty() && serde_json::from_slice::<IgnoredAny>(&body).is_ok() {
        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        return response;
    }
    (status, Json(decode_body(&body))).into_response()
}

/// Interpret an upstream body as JSON.
///
/// Bodies that are not JSON are relayed as a JSON string; an empty body
/// becomes `null`.
pub fn decode_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
