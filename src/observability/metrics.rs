//! Metrics collection and exposition.
//!
//! # Metrics
//! - `forwarder_requests_total` (counter): forwarded requests by mode, status
//! - `forwarder_rejected_total` (counter): requests refused before forwarding
//! - `forwarder_request_duration_seconds` (histogram): time to response headers
//! - `forwarder_stream_duration_seconds` (histogram): full relay duration
//! - `forwarder_stream_chunks_total` / `forwarder_stream_bytes_total` (counters)
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!("forwarder_requests_total", "Forwarded requests by mode and status");
    ::metrics::describe_counter!("forwarder_rejected_total", "Requests refused before forwarding");
    ::metrics::describe_histogram!(
        "forwarder_request_duration_seconds",
        "Time from request to response headers"
    );
    ::metrics::describe_histogram!(
        "forwarder_stream_duration_seconds",
        "Time from stream open to relay end"
    );
    ::metrics::describe_counter!("forwarder_stream_chunks_total", "Relayed stream chunks");
    ::metrics::describe_counter!("forwarder_stream_bytes_total", "Relayed stream bytes");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(mode: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "forwarder_requests_total",
        "mode" => mode,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("forwarder_request_duration_seconds", "mode" => mode)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rejected(status: u16) {
    ::metrics::counter!("forwarder_rejected_total", "status" => status.to_string()).increment(1);
}

pub fn record_stream_chunk(bytes: usize) {
    ::metrics::counter!("forwarder_stream_chunks_total").increment(1);
    ::metrics::counter!("forwarder_stream_bytes_total").increment(bytes as u64);
}

pub fn record_stream_finished(start: Instant) {
    ::metrics::histogram!("forwarder_stream_duration_seconds").record(start.elapsed().as_secs_f64());
}
