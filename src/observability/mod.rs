//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces:
//!     → errors.rs (monitor trace; error line + capture when a stage failed)
//!     → logging.rs (one access event)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//!     → Error tracing service (monitoring.rs, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging with request id on every line
//! - The monitor is injected; no DSN means a no-op monitor, never a crash

pub mod errors;
pub mod logging;
pub mod metrics;
pub mod monitoring;

pub use monitoring::{Monitor, NoopMonitor, RecordingMonitor, SentryMonitor, TraceLink};
