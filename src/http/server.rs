//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compose the middleware stages in their fixed order
//! - Mount the welcome route, the sub-routers and the fallback
//! - Bind the server to a listener and shut it down gracefully
//! - Run the rate limiter's window sweeper alongside the server
//!
//! # Stage Order (outermost first)
//! ```text
//! request id → trace span → request context
//!   → monitor trace (entry hook)
//!   → error stage (log + capture on the way out)
//!   → rate limiter → origin guard → CORS headers
//!   → access log → security headers
//!   → timeout → panic catcher → JSON body
//!   → routes / fallback
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::header::InvalidHeaderValue,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::body::{parse_json_body, BodyLimit};
use crate::http::request::{capture_context, ContextState, MakeRequestUuid, X_REQUEST_ID};
use crate::http::timeout::{enforce_deadline, RequestDeadline};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::errors::{handle_errors, panic_response, trace_request};
use crate::observability::logging::access_log;
use crate::observability::monitoring::Monitor;
use crate::routing::Mounts;
use crate::security::cors::{origin_guard, OriginPolicy};
use crate::security::headers::{security_headers, SecurityHeadersState};
use crate::security::rate_limit::{rate_limit_middleware, RateLimitState, RateLimiter};

/// Errors raised while assembling or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid CORS origin: {0}")]
    Origin(#[from] InvalidHeaderValue),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the backend.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// The limiter and monitor are shared services owned by the caller, so
    /// tests can inspect them and several servers may share one limiter.
    pub fn new(
        config: AppConfig,
        limiter: Arc<RateLimiter>,
        monitor: Arc<dyn Monitor>,
        mounts: Mounts,
    ) -> Result<Self, ServerError> {
        let router = Self::build_router(&config, limiter.clone(), monitor, mounts)?;
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware stages.
    fn build_router(
        config: &AppConfig,
        limiter: Arc<RateLimiter>,
        monitor: Arc<dyn Monitor>,
        mounts: Mounts,
    ) -> Result<Router, ServerError> {
        let trust_proxy = config.server.trust_proxy;
        let origin_policy = Arc::new(OriginPolicy::from_config(&config.cors)?);
        let cors = origin_policy.layer();

        let stages = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(from_fn_with_state(ContextState { trust_proxy }, capture_context))
            .layer(from_fn_with_state(monitor.clone(), trace_request))
            .layer(from_fn_with_state(monitor, handle_errors))
            .layer(from_fn_with_state(
                RateLimitState {
                    limiter,
                    enabled: config.rate_limit.enabled,
                    trust_proxy,
                },
                rate_limit_middleware,
            ))
            .layer(from_fn_with_state(origin_policy, origin_guard))
            .layer(cors)
            .layer(from_fn(access_log))
            .layer(from_fn_with_state(
                SecurityHeadersState {
                    enabled: config.security.headers_enabled,
                },
                security_headers,
            ))
            .layer(from_fn_with_state(
                RequestDeadline {
                    limit: Duration::from_secs(config.server.request_timeout_secs),
                },
                enforce_deadline,
            ))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(from_fn_with_state(
                BodyLimit {
                    max_bytes: config.security.max_body_bytes,
                },
                parse_json_body,
            ));

        Ok(mounts.into_router().layer(stages))
    }

    /// The fully layered router, e.g. for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        if self.config.rate_limit.enabled {
            let limiter = self.limiter.clone();
            let every = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            tokio::spawn(limiter.run_sweeper(every, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                    _ = shutdown_signal() => {}
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
