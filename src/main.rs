//! CougarCS backend server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id / span / context
//!                       │
//!                       ▼
//!                     monitor trace ──────────────┐
//!                       │                         │
//!                     error stage ◀── errors ──┐  │
//!                       │                      │  │
//!                     rate limiter ────────────┤  │
//!                     origin guard + CORS ─────┤  │
//!                     access log               │  │
//!                     security headers         │  │
//!                     timeout / panic catcher ─┤  │
//!                     JSON body ───────────────┤  │
//!                       │                      │  │
//!                       ▼                      │  │
//!                     GET /  │ /api/payment │ /api/send │ /api/events
//!                     fallback (500 "Error!") ─┘  │
//!                                                 ▼
//!                                        error tracing service
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use cougarcs_backend::config::loader::{resolve_config, PORT_ENV};
use cougarcs_backend::http::HttpServer;
use cougarcs_backend::lifecycle::Shutdown;
use cougarcs_backend::observability::{logging, metrics, monitoring};
use cougarcs_backend::routing::Mounts;
use cougarcs_backend::security::RateLimiter;

#[derive(Parser)]
#[command(name = "cougarcs-backend")]
#[command(about = "CougarCS backend HTTP server", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env file is the normal production case.
    let _ = dotenvy::dotenv();

    let config = resolve_config(cli.config.as_deref(), std::env::var(PORT_ENV).ok())?;

    logging::init_tracing(&config.observability);
    tracing::info!("cougarcs-backend v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        rate_limit_window_ms = config.rate_limit.window_ms,
        rate_limit_max = config.rate_limit.max_requests,
        allowed_origin = %config.cors.allowed_origin,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dsn = std::env::var(monitoring::MONITOR_DSN_ENV).ok();
    let monitor = monitoring::monitor_from_dsn(dsn.as_deref());
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, limiter, monitor, Mounts::default())?;
    server.run(listener, shutdown.subscribe()).await?;
    shutdown.trigger();

    tracing::info!("Shutdown complete");
    Ok(())
}
