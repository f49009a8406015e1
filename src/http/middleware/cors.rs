//! CORS gate.
//! Stamps permissive CORS headers on every response and answers preflight.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;

/// Pre-rendered CORS header values.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    /// Render the configured lists into header values.
    pub fn from_config(config: &CorsConfig) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            allow_methods: HeaderValue::from_str(&config.allow_methods.join(","))?,
            allow_headers: HeaderValue::from_str(&config.allow_headers.join(", "))?,
        })
    }
}

/// Set the CORS header set on `headers`, replacing any existing values.
pub fn apply_cors_headers(headers: &mut HeaderMap, cors: &CorsHeaders) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        cors.allow_methods.clone(),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        cors.allow_headers.clone(),
    );
}

/// Middleware: preflight short-circuit plus CORS headers on everything else.
pub async fn cors_gate(
    State(cors): State<Arc<CorsHeaders>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(response.headers_mut(), &cors);
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut(), &cors);
    response
}
