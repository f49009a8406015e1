//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the forwarder.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the request forwarder.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// HTTP surface (route path, body limit).
    pub server: ServerConfig,

    /// Upstream forwarding behavior.
    pub forward: ForwardConfig,

    /// CORS headers stamped on every response.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path the forwarding endpoint is mounted on.
    pub route: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            route: "/".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Total deadline for a buffered forward, in seconds.
    /// The streaming path has no overall deadline.
    pub buffered_timeout_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Pause after each relayed chunk in milliseconds. 0 disables it.
    pub chunk_delay_ms: u64,

    /// User-Agent sent upstream when the caller does not supply one.
    pub user_agent: String,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            buffered_timeout_secs: 30,
            connect_timeout_secs: 10,
            chunk_delay_ms: 1,
            user_agent: concat!("request-forwarder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value list for `Access-Control-Allow-Methods`.
    pub allow_methods: Vec<String>,

    /// Value list for `Access-Control-Allow-Headers`.
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_methods: ["GET", "OPTIONS", "PATCH", "DELETE", "POST", "PUT"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_headers: [
                "X-CSRF-Token",
                "X-Requested-With",
                "Accept",
                "Accept-Version",
                "Content-Length",
                "Content-MD5",
                "Content-Type",
                "Date",
                "X-Api-Version",
                "Authorization",
                "X-Api-Key",
                "Anthropic-Version",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
