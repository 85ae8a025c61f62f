//! Route table: the welcome route, the mounted routers and the fallback.

use axum::{routing::get, Router};

use crate::http::response::{fallback, welcome};

pub const PAYMENT_PREFIX: &str = "/api/payment";
pub const SEND_PREFIX: &str = "/api/send";
pub const EVENTS_PREFIX: &str = "/api/events";

/// Every prefix a router can be mounted under.
pub const MOUNT_PREFIXES: [&str; 3] = [PAYMENT_PREFIX, SEND_PREFIX, EVENTS_PREFIX];

/// The independently implemented routers bound to the mount prefixes.
///
/// Paths inside each router are relative to its prefix, so a payment router
/// declaring `/checkout` answers `/api/payment/checkout`.
#[derive(Debug, Clone, Default)]
pub struct Mounts {
    pub payment: Router,
    pub send: Router,
    pub events: Router,
}

impl Mounts {
    pub fn new(payment: Router, send: Router, events: Router) -> Self {
        Self {
            payment,
            send,
            events,
        }
    }

    /// Assemble the complete route table.
    ///
    /// A method a route does not serve gets the fallback rather than a 405.
    /// Routing is strict: `/api/payment/` is not `/api/payment`.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/", get(welcome))
            .nest(PAYMENT_PREFIX, self.payment)
            .nest(SEND_PREFIX, self.send)
            .nest(EVENTS_PREFIX, self.events)
            .method_not_allowed_fallback(fallback)
            .fallback(fallback)
    }
}
