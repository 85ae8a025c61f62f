//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (application log)
//! - Emit one access log event per response
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - JSON format for production, pretty format for development
//! - Access events use the `access` target so they can be filtered apart

use std::time::Instant;

use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::http::request::RequestMeta;
use crate::observability::metrics;

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("cougarcs_backend={0},access={0},tower_http={0}", level)
}

/// Install the global subscriber.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Middleware logging method, path, status, latency and client address.
pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();
    let meta = match request.extensions().get::<RequestMeta>() {
        Some(meta) => meta.clone(),
        None => RequestMeta::capture(&request, false),
    };

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        target: "access",
        request_id = %meta.request_id,
        method = %meta.method,
        path = %meta.path,
        status,
        latency_ms,
        client_ip = %meta.client_key(),
        "{} {} {} {:.3} ms",
        meta.method,
        meta.original_url,
        status,
        latency_ms
    );
    metrics::record_request(meta.method.as_str(), status, &meta.path, start_time);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_access_target() {
        assert_eq!(
            default_filter("debug"),
            "cougarcs_backend=debug,access=debug,tower_http=debug"
        );
    }
}
