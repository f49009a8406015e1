//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → middleware/cors.rs (preflight short-circuit, CORS headers)
//!     → middleware/method.rs (POST only)
//!     → request.rs (typed ForwardRequest from the JSON body)
//!     → forward subsystem (buffered or streaming)
//!     → response.rs (JSON error bodies)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{parse_forward_request, ForwardRequest, X_REQUEST_ID};
pub use server::{AppState, ForwarderServer, ServerError};
