//! Error tracing hooks.
//!
//! - [`trace_request`] is the entry hook: it opens a monitor trace around
//!   everything downstream and closes it with the final status.
//! - [`handle_errors`] is the terminal error stage: any response carrying a
//!   [`PipelineError`] is logged as a single line and, for server errors,
//!   forwarded to the monitor. The response itself is passed on untouched.
//! - [`panic_response`] turns a handler panic into a pipeline error so it
//!   reaches the error stage like any other failure.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::PipelineError;
use crate::http::request::RequestMeta;
use crate::observability::metrics;
use crate::observability::monitoring::{Monitor, TraceLink};

fn request_meta(request: &Request<Body>) -> RequestMeta {
    match request.extensions().get::<RequestMeta>() {
        Some(meta) => meta.clone(),
        None => RequestMeta::capture(request, false),
    }
}

/// Entry hook: one monitor trace per request.
pub async fn trace_request(
    State(monitor): State<Arc<dyn Monitor>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let trace = monitor.start_trace(&request_meta(&request));
    request.extensions_mut().insert(trace.link());
    let response = next.run(request).await;
    trace.finish(response.status());
    response
}

/// `{status} - {message} - {url} - {method} - {ip}`
pub fn error_line(error: &PipelineError, meta: &RequestMeta) -> String {
    format!(
        "{} - {} - {} - {} - {}",
        error.status().as_u16(),
        error.message(),
        meta.original_url,
        meta.method,
        meta.client_key()
    )
}

/// Only server-side failures are worth a monitor event.
pub fn should_capture(error: &PipelineError) -> bool {
    error.status().is_server_error()
}

/// Terminal error stage.
pub async fn handle_errors(
    State(monitor): State<Arc<dyn Monitor>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let meta = request_meta(&request);
    let link = request
        .extensions()
        .get::<TraceLink>()
        .cloned()
        .unwrap_or_default();
    let response = next.run(request).await;

    if let Some(error) = response.extensions().get::<PipelineError>() {
        tracing::error!(
            request_id = %meta.request_id,
            kind = %error.kind(),
            status = error.status().as_u16(),
            "{}",
            error_line(error, &meta)
        );
        metrics::record_error(error.kind());

        if should_capture(error) {
            monitor.capture_error(error, &meta, &link);
        }
    }

    response
}

/// Response for a panicking handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };

    PipelineError::handler(None, format!("handler panicked: {}", detail)).into_response()
}
