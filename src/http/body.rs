//! JSON body parsing stage.
//!
//! Requests declaring a JSON content type have their body read (up to the
//! configured limit) and parsed before routing. The parsed value is stored
//! as a [`JsonBody`] extension and the raw bytes are put back, so handlers
//! may use either `JsonBody` or axum's own `Json<T>` extractor.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::http::error::PipelineError;

/// Parsed request body. Empty object when the request carried no JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl Default for JsonBody {
    fn default() -> Self {
        JsonBody(Value::Object(Map::new()))
    }
}

/// Settings the body stage needs.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit {
    pub max_bytes: usize,
}

/// Returns true for `application/json` and `application/*+json`.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Parse raw bytes the way `express.json()` does: empty means `{}`.
pub fn parse_json(bytes: &[u8]) -> Result<Value, PipelineError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(PipelineError::malformed_body)
}

/// Middleware parsing JSON bodies ahead of the routers.
pub async fn parse_json_body(
    State(limit): State<BodyLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_json_content_type(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes: Bytes = match axum::body::to_bytes(body, limit.max_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, limit = limit.max_bytes, "Request body rejected");
            return PipelineError::payload_too_large(limit.max_bytes).into_response();
        }
    };

    match parse_json(&bytes) {
        Ok(value) => {
            parts.extensions.insert(JsonBody(value));
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Err(err) => err.into_response(),
    }
}

impl<S> FromRequestParts<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<JsonBody>().cloned().unwrap_or_default())
    }
}
