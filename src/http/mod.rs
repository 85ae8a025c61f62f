//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, stage composition)
//!     → request.rs (request id, client identity, RequestMeta)
//!     → [security, logging and error stages]
//!     → timeout.rs (request deadline)
//!     → body.rs (JSON body parsing)
//!     → [routing: welcome route, mounted routers]
//!     → response.rs (welcome payload, fallback)
//!     → error.rs (PipelineError → status + body)
//!     → Send to client
//! ```

pub mod body;
pub mod error;
pub mod request;
pub mod response;
pub mod server;
pub mod timeout;

pub use body::JsonBody;
pub use error::{ErrorKind, PipelineError};
pub use request::{RequestMeta, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
