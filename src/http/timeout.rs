//! Request deadline stage.
//!
//! A request still running when the deadline passes is dropped and answered
//! with a [`PipelineError`], so it reaches the error stage like any other
//! failure.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::timeout;

use crate::http::error::PipelineError;

/// Settings the deadline stage needs.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline {
    pub limit: Duration,
}

pub async fn enforce_deadline(
    State(deadline): State<RequestDeadline>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match timeout(deadline.limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(limit_secs = deadline.limit.as_secs(), "Request timed out");
            PipelineError::timed_out(deadline.limit).into_response()
        }
    }
}
