//! Tests against a real listener, the way clients see the server.

use std::sync::Arc;
use std::time::Duration;

use cougarcs_backend::config::AppConfig;
use cougarcs_backend::http::HttpServer;
use cougarcs_backend::lifecycle::Shutdown;
use cougarcs_backend::observability::{Monitor, RecordingMonitor};
use cougarcs_backend::security::RateLimiter;

mod common;

#[tokio::test]
async fn test_serves_and_shuts_down() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = AppConfig::default();
    config.server.bind_address = addr.to_string();

    let monitor = Arc::new(RecordingMonitor::new());
    let dyn_monitor: Arc<dyn Monitor> = monitor.clone();
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let server = HttpServer::new(config, limiter.clone(), dyn_monitor, common::test_mounts()).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    common::wait_until_listening(addr).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client.get(format!("http://{}/", addr)).send().await.expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["welcome"], "CougarCS Backend 🐯");

    let res = client.get(format!("http://{}/nope", addr)).send().await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Error!");

    // The peer address comes from the socket.
    let captured = monitor.errors();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].meta.client_ip, Some(addr.ip()));
    assert_eq!(limiter.tracked_clients(), 1);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_rate_limit_over_the_wire() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = AppConfig::default();
    config.rate_limit.max_requests = 3;

    let dyn_monitor: Arc<dyn Monitor> = Arc::new(RecordingMonitor::new());
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let server = HttpServer::new(config, limiter, dyn_monitor, common::test_mounts()).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    common::wait_until_listening(addr).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let mut statuses = Vec::new();
    for _ in 0..4 {
        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        statuses.push(res.status().as_u16());
    }

    assert_eq!(statuses, vec![200, 200, 200, 429]);

    shutdown.trigger();
}
