//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check CORS lists produce valid header values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ForwarderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, Method};
use thiserror::Error;

use crate::config::schema::ForwarderConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ForwarderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() || tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new(
                "listener.tls",
                "cert_path and key_path must both be set",
            ));
        }
    }

    if !config.server.route.starts_with('/') {
        errors.push(ValidationError::new(
            "server.route",
            format!("'{}' must start with '/'", config.server.route),
        ));
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::new("server.max_body_size", "must be greater than 0"));
    }

    if config.forward.buffered_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "forward.buffered_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.forward.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "forward.connect_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.cors.allow_methods.is_empty() {
        errors.push(ValidationError::new("cors.allow_methods", "must not be empty"));
    }
    for method in &config.cors.allow_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cors.allow_methods",
                format!("'{}' is not an HTTP method", method),
            ));
        }
    }
    if config.cors.allow_headers.is_empty() {
        errors.push(ValidationError::new("cors.allow_headers", "must not be empty"));
    }
    for name in &config.cors.allow_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cors.allow_headers",
                format!("'{}' is not a header name", name),
            ));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
