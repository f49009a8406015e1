//! Request Forwarder Library
//!
//! A single HTTP endpoint that POSTs a caller-described payload to a
//! caller-chosen target and relays the answer, either buffered or streamed
//! chunk by chunk.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ForwarderConfig;
pub use http::ForwarderServer;
pub use lifecycle::Shutdown;
