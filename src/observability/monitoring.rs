//! Error-tracing collaborator.
//!
//! The pipeline talks to the monitoring service through [`Monitor`]: one
//! trace per request (opened by the entry hook, finished with the final
//! status) and one capture per server-side error (from the error stage).
//! The instance is injected into the pipeline, never looked up globally.

use std::fmt;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use sentry::protocol::SpanStatus;
use thiserror::Error;

use crate::http::error::PipelineError;
use crate::http::request::RequestMeta;

/// Environment variable holding the monitoring DSN.
pub const MONITOR_DSN_ENV: &str = "SENTRY_URL";

/// Ties an error capture to the trace of the request it happened in.
///
/// The entry hook stores it in the request extensions; the error stage
/// hands it back to [`Monitor::capture_error`].
#[derive(Clone, Default)]
pub struct TraceLink {
    trace_id: Option<String>,
    span: Option<sentry::TransactionOrSpan>,
}

impl TraceLink {
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}

impl fmt::Debug for TraceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceLink")
            .field("trace_id", &self.trace_id)
            .field("has_span", &self.span.is_some())
            .finish()
    }
}

/// An open per-request trace.
pub trait RequestTrace: Send {
    fn link(&self) -> TraceLink {
        TraceLink::default()
    }

    fn finish(self: Box<Self>, status: StatusCode);
}

/// Destination for request traces and captured errors.
pub trait Monitor: Send + Sync {
    fn start_trace(&self, meta: &RequestMeta) -> Box<dyn RequestTrace>;

    fn capture_error(&self, error: &PipelineError, meta: &RequestMeta, link: &TraceLink);
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid monitor DSN: {0}")]
    Dsn(#[from] sentry::types::ParseDsnError),
}

/// Monitor that drops everything. Used when no DSN is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

struct NoopTrace;

impl RequestTrace for NoopTrace {
    fn finish(self: Box<Self>, _status: StatusCode) {}
}

impl Monitor for NoopMonitor {
    fn start_trace(&self, _meta: &RequestMeta) -> Box<dyn RequestTrace> {
        Box::new(NoopTrace)
    }

    fn capture_error(&self, _error: &PipelineError, _meta: &RequestMeta, _link: &TraceLink) {}
}

/// Monitor reporting to a Sentry-compatible service.
pub struct SentryMonitor {
    _guard: sentry::ClientInitGuard,
}

impl SentryMonitor {
    pub fn init(dsn: &str) -> Result<Self, MonitorError> {
        let dsn: sentry::types::Dsn = dsn.trim().parse()?;
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            ..Default::default()
        });
        Ok(Self { _guard: guard })
    }
}

struct SentryTrace {
    request_id: String,
    transaction: sentry::Transaction,
}

impl RequestTrace for SentryTrace {
    fn link(&self) -> TraceLink {
        TraceLink {
            trace_id: Some(self.request_id.clone()),
            span: Some(self.transaction.clone().into()),
        }
    }

    fn finish(self: Box<Self>, status: StatusCode) {
        self.transaction.set_status(span_status(status));
        self.transaction
            .set_data("http.status_code", status.as_u16().into());
        self.transaction.finish();
    }
}

impl Monitor for SentryMonitor {
    fn start_trace(&self, meta: &RequestMeta) -> Box<dyn RequestTrace> {
        let name = format!("{} {}", meta.method, meta.path);
        let ctx = sentry::TransactionContext::new(&name, "http.server");
        let transaction = sentry::start_transaction(ctx);
        transaction.set_data("request_id", meta.request_id.clone().into());
        Box::new(SentryTrace {
            request_id: meta.request_id.clone(),
            transaction,
        })
    }

    fn capture_error(&self, error: &PipelineError, meta: &RequestMeta, link: &TraceLink) {
        sentry::with_scope(
            |scope| {
                scope.set_span(link.span.clone());
                scope.set_tag("error.kind", error.kind());
                scope.set_tag("http.method", &meta.method);
                scope.set_tag("request_id", &meta.request_id);
                scope.set_extra("url", meta.original_url.clone().into());
                scope.set_extra("client_ip", meta.client_key().into());
            },
            || {
                sentry::capture_message(error.message(), sentry::Level::Error);
            },
        );
    }
}

/// Map an HTTP status onto the trace status vocabulary.
pub fn span_status(status: StatusCode) -> SpanStatus {
    match status {
        s if s.is_success() || s.is_redirection() || s.is_informational() => SpanStatus::Ok,
        StatusCode::UNAUTHORIZED => SpanStatus::Unauthenticated,
        StatusCode::FORBIDDEN => SpanStatus::PermissionDenied,
        StatusCode::NOT_FOUND => SpanStatus::NotFound,
        StatusCode::CONFLICT => SpanStatus::AlreadyExists,
        StatusCode::TOO_MANY_REQUESTS => SpanStatus::ResourceExhausted,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => SpanStatus::DeadlineExceeded,
        StatusCode::NOT_IMPLEMENTED => SpanStatus::Unimplemented,
        StatusCode::SERVICE_UNAVAILABLE => SpanStatus::Unavailable,
        s if s.is_client_error() => SpanStatus::InvalidArgument,
        _ => SpanStatus::InternalError,
    }
}

/// Pick the monitor for the given DSN. A missing or broken DSN disables
/// error tracing instead of failing startup.
pub fn monitor_from_dsn(dsn: Option<&str>) -> Arc<dyn Monitor> {
    match dsn.map(str::trim).filter(|dsn| !dsn.is_empty()) {
        None => {
            tracing::warn!(env = MONITOR_DSN_ENV, "No monitor DSN configured, error tracing disabled");
            Arc::new(NoopMonitor)
        }
        Some(dsn) => match SentryMonitor::init(dsn) {
            Ok(monitor) => {
                tracing::info!("Error tracing enabled");
                Arc::new(monitor)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Monitor DSN rejected, error tracing disabled");
                Arc::new(NoopMonitor)
            }
        },
    }
}

/// A trace as recorded by [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedTrace {
    pub meta: RequestMeta,
    pub status: StatusCode,
}

/// A capture as recorded by [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub error: PipelineError,
    pub meta: RequestMeta,
    pub trace_id: Option<String>,
}

/// In-memory monitor, for tests and local inspection.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    traces: Arc<Mutex<Vec<FinishedTrace>>>,
    errors: Arc<Mutex<Vec<CapturedError>>>,
}

struct RecordingTrace {
    meta: RequestMeta,
    sink: Arc<Mutex<Vec<FinishedTrace>>>,
}

impl RequestTrace for RecordingTrace {
    fn link(&self) -> TraceLink {
        TraceLink {
            trace_id: Some(self.meta.request_id.clone()),
            span: None,
        }
    }

    fn finish(self: Box<Self>, status: StatusCode) {
        let RecordingTrace { meta, sink } = *self;
        if let Ok(mut traces) = sink.lock() {
            traces.push(FinishedTrace { meta, status });
        };
    }
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<FinishedTrace> {
        self.traces.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<CapturedError> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Monitor for RecordingMonitor {
    fn start_trace(&self, meta: &RequestMeta) -> Box<dyn RequestTrace> {
        Box::new(RecordingTrace {
            meta: meta.clone(),
            sink: Arc::clone(&self.traces),
        })
    }

    fn capture_error(&self, error: &PipelineError, meta: &RequestMeta, link: &TraceLink) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(CapturedError {
                error: error.clone(),
                meta: meta.clone(),
                trace_id: link.trace_id.clone(),
            });
        }
    }
}
