//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ForwarderConfig (validated, immutable)
//!     → shared via Arc with the request handlers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so an absent file means a working setup
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CorsConfig, ForwardConfig, ForwarderConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ServerConfig, TlsConfig,
};
