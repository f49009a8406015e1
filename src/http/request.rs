//! Inbound request parsing and validation.
//!
//! # Responsibilities
//! - Turn the raw JSON body into a typed [`ForwardRequest`]
//! - Reject a missing target before anything else is looked at
//! - Validate the target URL and caller headers up front
//! - Expose the request ID assigned by the request-id layer
//!
//! # Design Decisions
//! - `data` is opaque and never inspected
//! - Unknown fields are rejected rather than ignored
//! - Header names are checked here so forwarding never fails on them later

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::forward::ForwardError;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Body shape accepted on the wire.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForwardRequestBody {
    target: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    stream: Option<bool>,
}

/// A validated forwarding instruction.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// Absolute http(s) URL of the upstream.
    pub target: Url,
    /// Payload sent upstream as the JSON request body. `None` sends no body.
    pub data: Option<Value>,
    /// Headers sent upstream verbatim.
    pub headers: HeaderMap,
    /// Relay the upstream body incrementally instead of buffering it.
    pub stream: bool,
}

/// Parse and validate a forwarding request body.
pub fn parse_forward_request(body: &[u8]) -> Result<ForwardRequest, ForwardError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(body).map_err(|e| ForwardError::InvalidBody(e.to_string()))?
    };

    let Value::Object(fields) = &value else {
        return Err(ForwardError::InvalidBody(
            "expected a JSON object".to_string(),
        ));
    };

    let target_missing = match fields.get("target") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if target_missing {
        return Err(ForwardError::MissingTarget);
    }

    let raw: ForwardRequestBody =
        serde_json::from_value(value).map_err(|e| ForwardError::InvalidBody(e.to_string()))?;

    Ok(ForwardRequest {
        target: parse_target(&raw.target)?,
        data: raw.data,
        headers: parse_headers(raw.headers.unwrap_or_default())?,
        stream: raw.stream.unwrap_or(false),
    })
}

fn parse_target(target: &str) -> Result<Url, ForwardError> {
    let url = Url::parse(target.trim()).map_err(|e| ForwardError::InvalidTarget(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ForwardError::InvalidTarget(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

fn parse_headers(raw: BTreeMap<String, String>) -> Result<HeaderMap, ForwardError> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ForwardError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let header_value =
            HeaderValue::from_str(&value).map_err(|e| ForwardError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
