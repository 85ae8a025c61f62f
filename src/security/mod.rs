//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed window)
//!     → cors.rs (origin guard, then CORS headers / preflight)
//!     → [access log]
//!     → headers.rs (hardening headers on the way out)
//!     → Pass to body parsing and routing
//! ```
//!
//! # Design Decisions
//! - Guards reject with a `PipelineError` so the error stage sees them
//! - No trust in client input: forwarded addresses only when configured

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::OriginPolicy;
pub use rate_limit::{RateLimiter, RateLimitState};
