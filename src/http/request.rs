//! Request context.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client sent one
//! - Resolve the client identity (socket peer, or first proxy hop)
//! - Capture method, path and original URL once, for every later stage
//!
//! # Design Decisions
//! - Context is captured as early as possible, before any guard runs
//! - The captured [`RequestMeta`] is immutable and cheap to clone

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request id in both directions.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Generates UUID v4 request ids for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Everything later stages need to describe a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub original_url: String,
    pub client_ip: Option<IpAddr>,
}

impl RequestMeta {
    /// Capture the context of an incoming request.
    pub fn capture<B>(request: &axum::http::Request<B>, trust_proxy: bool) -> Self {
        Self::from_components(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
            trust_proxy,
        )
    }

    fn from_components(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        extensions: &Extensions,
        trust_proxy: bool,
    ) -> Self {
        let request_id = headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let original_url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            request_id,
            method: method.clone(),
            path: uri.path().to_string(),
            original_url,
            client_ip: resolve_client_ip(headers, extensions, trust_proxy),
        }
    }

    /// Key used to attribute traffic to one client.
    pub fn client_key(&self) -> String {
        self.client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Resolve the client address of a request.
///
/// With `trust_proxy` the left-most `X-Forwarded-For` entry wins, otherwise
/// the socket peer recorded by `into_make_service_with_connect_info`.
pub fn client_ip<B>(request: &axum::http::Request<B>, trust_proxy: bool) -> Option<IpAddr> {
    resolve_client_ip(request.headers(), request.extensions(), trust_proxy)
}

fn resolve_client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy: bool,
) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Settings the context stage needs.
#[derive(Debug, Clone, Copy)]
pub struct ContextState {
    pub trust_proxy: bool,
}

/// Middleware attaching [`RequestMeta`] to the request.
pub async fn capture_context(
    State(state): State<ContextState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let meta = RequestMeta::capture(&request, state.trust_proxy);
    request.extensions_mut().insert(meta);
    next.run(request).await
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(meta) = parts.extensions.get::<RequestMeta>() {
            return Ok(meta.clone());
        }

        Ok(RequestMeta::from_components(
            &parts.method,
            &parts.uri,
            &parts.headers,
            &parts.extensions,
            false,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> axum::http::Request<()> {
        axum::http::Request::builder().uri(uri).body(()).unwrap()
    }

    #[test]
    fn peer_address_is_default_identity() {
        let mut req = request("/api/events?page=2");
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        req.headers_mut().insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4"));

        let meta = RequestMeta::capture(&req, false);
        assert_eq!(meta.client_ip, Some(peer.ip()));
        assert_eq!(meta.path, "/api/events");
        assert_eq!(meta.original_url, "/api/events?page=2");
        assert_eq!(meta.request_id, "unknown");
    }

    #[test]
    fn forwarded_for_used_behind_proxy() {
        let mut req = request("/");
        req.headers_mut().insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        let ip = client_ip(&req, true);
        assert_eq!(ip, Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn missing_identity_is_unknown() {
        let meta = RequestMeta::capture(&request("/"), true);
        assert_eq!(meta.client_ip, None);
        assert_eq!(meta.client_key(), "unknown");
    }

    #[test]
    fn request_ids_are_uuids() {
        let mut maker = MakeRequestUuid;
        let id = maker.make_request_id(&request("/")).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
