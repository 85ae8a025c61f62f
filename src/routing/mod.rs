//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after the middleware stages)
//!     → exact `GET /`            → welcome payload
//!     → `/api/payment/...`       → payment router
//!     → `/api/send/...`          → email router
//!     → `/api/events/...`        → events router
//!     → anything else            → fallback (500 "Error!")
//! ```
//!
//! # Design Decisions
//! - Mounted routers are supplied by the caller; this crate only places them
//! - Prefix matching is segment-aware (`/api/sender` is not `/api/send`)
//! - Routes are fixed at startup, immutable at runtime

pub mod mounts;

pub use mounts::{Mounts, EVENTS_PREFIX, MOUNT_PREFIXES, PAYMENT_PREFIX, SEND_PREFIX};
