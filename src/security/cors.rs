//! Cross-origin policy.
//!
//! Two pieces: an origin guard that refuses requests from origins outside
//! the allow-list, and tower-http's `CorsLayer` which answers preflights and
//! adds the `Access-Control-*` headers for the allowed origin only.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, header::InvalidHeaderValue, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::http::error::PipelineError;

/// The configured allow-list, in header form.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: HeaderValue,
    enforce: bool,
}

impl OriginPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allowed: HeaderValue::from_str(&config.allowed_origin)?,
            enforce: config.enforce,
        })
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        *origin == self.allowed
    }

    /// Build the header-producing layer for this policy.
    ///
    /// `AllowOrigin::list` only echoes the origin back when it matches, so
    /// other origins never see `Access-Control-Allow-Origin`.
    pub fn layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([self.allowed.clone()]))
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
            ])
            .allow_headers(AllowHeaders::mirror_request())
    }
}

/// Middleware rejecting requests whose `Origin` is not allow-listed.
pub async fn origin_guard(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let verdict = match request.headers().get(header::ORIGIN) {
        None => None,
        Some(origin) if policy.allows(origin) => None,
        Some(origin) => Some(origin.to_str().unwrap_or("<non-ascii>").to_string()),
    };

    match verdict {
        Some(origin) if policy.enforce => {
            tracing::warn!(origin = %origin, "Cross-origin request refused");
            PipelineError::forbidden_origin(&origin).into_response()
        }
        _ => next.run(request).await,
    }
}
