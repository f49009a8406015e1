//! Method guard.
//! Only POST reaches the forwarder.

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::response::error_response;

pub async fn method_guard(req: Request<Body>, next: Next) -> Response {
    if req.method() != Method::POST {
        tracing::debug!(method = %req.method(), "Rejecting method");
        let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
        return response;
    }
    next.run(req).await
}
