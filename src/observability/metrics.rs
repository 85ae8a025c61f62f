//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_rate_limited_total` (counter): requests refused by the limiter
//! - `http_errors_total` (counter): pipeline errors by kind
//!
//! # Design Decisions
//! - Route label is the mount prefix, never the raw path (bounded cardinality)
//! - Recording is a no-op until an exporter is installed

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::http::error::ErrorKind;
use crate::routing::MOUNT_PREFIXES;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Collapse a request path to the label used in metrics.
pub fn route_label(path: &str) -> &'static str {
    if path == "/" {
        return "/";
    }
    MOUNT_PREFIXES
        .iter()
        .find(|prefix| {
            path.strip_prefix(**prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
        .copied()
        .unwrap_or("unmatched")
}

pub fn record_request(method: &str, status: u16, path: &str, start_time: Instant) {
    let route = route_label(path);
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route
    )
    .record(start_time.elapsed().as_secs_f64());
}

pub fn record_rate_limited(reason: &'static str) {
    metrics::counter!("http_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_error(kind: ErrorKind) {
    metrics::counter!("http_errors_total", "kind" => kind.as_str()).increment(1);
}
