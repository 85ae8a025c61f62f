//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, limits > 0, timeouts > 0)
//! - Check that the CORS origin is a bare scheme://host[:port] origin
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,
    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,
    #[error("rate_limit.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,
    #[error("cors.allowed_origin `{0}` is not an http(s) origin")]
    Origin(String),
    #[error("security.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    if !is_origin(&config.cors.allowed_origin) {
        errors.push(ValidationError::Origin(config.cors.allowed_origin.clone()));
    }

    if config.security.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// Browsers send `Origin` as scheme://host[:port] with nothing after it.
fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !value.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
