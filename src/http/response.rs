//! Built-in responders: the welcome route and the fallback.

use axum::{extract::Request, Json};
use serde::Serialize;

use crate::http::error::PipelineError;

/// Greeting returned by `GET /`.
pub const WELCOME_MESSAGE: &str = "CougarCS Backend 🐯";

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub welcome: &'static str,
}

pub async fn welcome() -> Json<Welcome> {
    Json(Welcome {
        welcome: WELCOME_MESSAGE,
    })
}

/// Catches everything no route answered.
pub async fn fallback(request: Request) -> PipelineError {
    PipelineError::unmatched(request.method().as_str(), request.uri().path())
}
