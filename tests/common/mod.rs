//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cougarcs_backend::config::AppConfig;
use cougarcs_backend::http::{HttpServer, JsonBody, PipelineError};
use cougarcs_backend::observability::{Monitor, RecordingMonitor};
use cougarcs_backend::routing::Mounts;
use cougarcs_backend::security::RateLimiter;

pub const CLIENT: &str = "198.51.100.7:40000";

/// Stand-ins for the payment, email and events routers.
pub fn test_mounts() -> Mounts {
    let payment = Router::new()
        .route(
            "/",
            post(|JsonBody(body): JsonBody| async move { Json(json!({ "received": body })) }),
        )
        .route("/echo", get(|JsonBody(body): JsonBody| async move { Json(body) }));

    let send = Router::new()
        .route(
            "/",
            post(|Json(body): Json<Value>| async move { Json(json!({ "sent_to": body["to"] })) }),
        )
        .route(
            "/fail",
            get(|| async { Err::<(), _>(PipelineError::handler(None, "mail provider down")) }),
        )
        .route(
            "/missing",
            get(|| async {
                Err::<(), _>(PipelineError::handler(Some(StatusCode::NOT_FOUND), "no template 7"))
            }),
        );

    let events = Router::new()
        .route("/", get(|| async { Json(json!([{ "id": 1, "title": "Hackathon" }])) }))
        .route("/panic", get(explode))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "too late"
            }),
        );

    Mounts::new(payment, send, events)
}

async fn explode() -> &'static str {
    panic!("calendar exploded")
}

/// A router built like production, with a recording monitor.
pub struct TestApp {
    pub router: Router,
    pub monitor: Arc<RecordingMonitor>,
    pub limiter: Arc<RateLimiter>,
}

pub fn app_with(config: AppConfig) -> TestApp {
    let monitor = Arc::new(RecordingMonitor::new());
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let dyn_monitor: Arc<dyn Monitor> = monitor.clone();
    let server = HttpServer::new(config, limiter.clone(), dyn_monitor, test_mounts())
        .expect("valid test config");

    TestApp {
        router: server.router(),
        monitor,
        limiter,
    }
}

pub fn app() -> TestApp {
    app_with(AppConfig::default())
}

/// Request from `CLIENT`, as `into_make_service_with_connect_info` would see it.
pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

pub fn from_client(request: Request<Body>, client: &str) -> Request<Body> {
    let mut request = request;
    let addr: SocketAddr = client.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(from_client(request, CLIENT))
        .await
        .unwrap()
}

pub async fn send_from(router: &Router, request: Request<Body>, client: &str) -> Response {
    router
        .clone()
        .oneshot(from_client(request, client))
        .await
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Wait until a freshly spawned server accepts connections.
pub async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} never came up", addr);
}
