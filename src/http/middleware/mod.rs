//! Request gates that run before the forwarder.
//!
//! ```text
//! cors.rs (preflight + headers) → method.rs (POST only) → handler
//! ```

pub mod cors;
pub mod method;

pub use cors::{apply_cors_headers, cors_gate, CorsHeaders};
pub use method::method_guard;
