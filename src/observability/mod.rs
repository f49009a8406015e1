//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and relay tasks produce:
//!     → logging.rs (structured log events, spans keyed by request ID)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
