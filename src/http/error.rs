//! Request-path errors.
//!
//! Every stage of the pipeline that refuses a request, and every mounted
//! handler that fails, produces a [`PipelineError`]. Its response carries the
//! error in the response extensions so the terminal error stage can log it
//! and hand it to the monitor on the way out.

use std::fmt;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body sent for unmatched routes and server-side failures.
pub const GENERIC_ERROR_BODY: &str = "Error!";

/// Body sent when the rate limiter rejects a request.
pub const RATE_LIMIT_BODY: &str = "Too many requests, please try again later.";

/// Kind of failure, independent of how it is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimitExceeded,
    ForbiddenOrigin,
    MalformedBody,
    PayloadTooLarge,
    RequestTimeout,
    UnmatchedRoute,
    UnhandledHandlerError,
}

impl ErrorKind {
    /// Status used when the error carries no hint of its own.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ForbiddenOrigin => StatusCode::FORBIDDEN,
            ErrorKind::MalformedBody => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::UnmatchedRoute => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::UnhandledHandlerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::ForbiddenOrigin => "forbidden_origin",
            ErrorKind::MalformedBody => "malformed_body",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::RequestTimeout => "request_timeout",
            ErrorKind::UnmatchedRoute => "unmatched_route",
            ErrorKind::UnhandledHandlerError => "unhandled_handler_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised somewhere in the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PipelineError {
    kind: ErrorKind,
    status_hint: Option<StatusCode>,
    message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_hint: None,
            message: message.into(),
        }
    }

    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimitExceeded, RATE_LIMIT_BODY)
    }

    pub fn forbidden_origin(origin: &str) -> Self {
        Self::new(
            ErrorKind::ForbiddenOrigin,
            format!("Origin {} is not allowed", origin),
        )
    }

    pub fn malformed_body(reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::MalformedBody, format!("Malformed JSON body: {}", reason))
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ErrorKind::PayloadTooLarge,
            format!("request entity too large (limit {} bytes)", limit),
        )
    }

    pub fn timed_out(limit: Duration) -> Self {
        Self::new(
            ErrorKind::RequestTimeout,
            format!("request did not complete within {}s", limit.as_secs()),
        )
    }

    pub fn unmatched(method: &str, path: &str) -> Self {
        Self::new(
            ErrorKind::UnmatchedRoute,
            format!("No route for {} {}", method, path),
        )
    }

    /// Failure raised by a mounted handler, optionally with its own status.
    pub fn handler(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UnhandledHandlerError,
            status_hint: status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_hint(&self) -> Option<StatusCode> {
        self.status_hint
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status sent to the client.
    pub fn status(&self) -> StatusCode {
        self.status_hint.unwrap_or_else(|| self.kind.status())
    }

    /// Body sent to the client. Detail stays in the log line for anything
    /// that is not the client's own fault.
    pub fn public_body(&self) -> String {
        let status = self.status();
        match self.kind {
            ErrorKind::RateLimitExceeded => RATE_LIMIT_BODY.to_string(),
            ErrorKind::ForbiddenOrigin | ErrorKind::MalformedBody | ErrorKind::PayloadTooLarge => {
                self.message.clone()
            }
            ErrorKind::RequestTimeout => status
                .canonical_reason()
                .unwrap_or(GENERIC_ERROR_BODY)
                .to_string(),
            ErrorKind::UnmatchedRoute => GENERIC_ERROR_BODY.to_string(),
            ErrorKind::UnhandledHandlerError if status.is_server_error() => {
                GENERIC_ERROR_BODY.to_string()
            }
            ErrorKind::UnhandledHandlerError => status
                .canonical_reason()
                .unwrap_or(GENERIC_ERROR_BODY)
                .to_string(),
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.public_body()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response.extensions_mut().insert(self);
        response
    }
}
