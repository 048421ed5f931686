//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by kind (api, page), status
//! - `dispatch_request_duration_seconds` (histogram): latency by kind
//! - `task_executions_total` (counter): task runs by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - The Prometheus exporter is only installed when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_dispatch(kind: &'static str, status: u16, start: Instant) {
    ::metrics::counter!("dispatch_requests_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
    ::metrics::histogram!("dispatch_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// Record one task execution: "ok", "failed", "skipped" or "interrupted".
pub fn record_task(outcome: &'static str) {
    ::metrics::counter!("task_executions_total", "outcome" => outcome).increment(1);
}
