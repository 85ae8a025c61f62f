//! Rate limiting middleware with fixed per-client windows.
//!
//! Each client gets a window that opens with its first request. Up to
//! `max_requests` requests are admitted inside the window; the rest are
//! rejected until the window elapses and a new one opens.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::error::PipelineError;
use crate::http::request::RequestMeta;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RETRY_AFTER: HeaderName = HeaderName::from_static("retry-after");

/// Request count for one client inside the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { limit: u32, remaining: u32 },
    Limited { limit: u32, retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        match *self {
            Decision::Allowed { limit, remaining } => {
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            }
            Decision::Limited { limit, retry_after } => {
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
                // Round up so clients never retry before the window resets.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                headers.insert(RETRY_AFTER, HeaderValue::from(secs));
            }
        }
    }
}

/// Shared fixed-window limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms), config.max_requests)
    }

    /// Count one request for `key` and decide whether it may pass.
    pub fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count < self.max_requests {
            window.count += 1;
            Decision::Allowed {
                limit: self.max_requests,
                remaining: self.max_requests - window.count,
            }
        } else {
            let elapsed = now.duration_since(window.started);
            Decision::Limited {
                limit: self.max_requests,
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Drop windows that have elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.windows.retain(|_, window| {
            let live = now.duration_since(window.started) < self.window;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of clients with a live window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Periodically purge expired windows until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked_clients(), "Expired rate limit windows purged");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopped");
                    break;
                }
            }
        }
    }
}

/// State for the rate limit stage.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub enabled: bool,
    pub trust_proxy: bool,
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let key = match request.extensions().get::<RequestMeta>() {
        Some(meta) => meta.client_key(),
        None => RequestMeta::capture(&request, state.trust_proxy).client_key(),
    };

    let decision = state.limiter.check(&key);
    let mut response = if decision.is_allowed() {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited("window_limit");
        PipelineError::rate_limited().into_response()
    };

    decision.apply_headers(response.headers_mut());
    response
}
