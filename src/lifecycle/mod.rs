//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber (server, sweeper) stops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown of the server
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting, drain in-flight requests, exit
//! - Background tasks observe the same broadcast as the server

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
