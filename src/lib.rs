//! CougarCS backend HTTP pipeline.
//!
//! Rate limiting, CORS, access logging, security headers, JSON body parsing
//! and error tracing in front of the payment, email and events routers.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Mounts;
