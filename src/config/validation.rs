//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, batch size > 0)
//! - Validate addresses and the client endpoint URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BlestConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::BlestConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["plain", "json"];

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &BlestConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &'static str, message: String| {
        if !ok {
            errors.push(ValidationError { field, message });
        }
    };

    let listener = &config.listener;
    check(
        listener.bind_address.parse::<SocketAddr>().is_ok(),
        "listener.bind_address",
        format!("'{}' is not a socket address", listener.bind_address),
    );
    check(listener.max_body_size > 0, "listener.max_body_size", "must be greater than 0".into());
    check(
        listener.request_timeout_secs > 0,
        "listener.request_timeout_secs",
        "must be greater than 0".into(),
    );

    check(
        config.router.timeout != Some(0),
        "router.timeout",
        "must be a positive number of milliseconds".into(),
    );

    let client = &config.client;
    let endpoint_ok = Url::parse(&client.endpoint).is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
    check(
        endpoint_ok,
        "client.endpoint",
        format!("'{}' is not an http(s) URL", client.endpoint),
    );
    check(client.max_batch_size > 0, "client.max_batch_size", "must be greater than 0".into());
    check(client.timeout_secs > 0, "client.timeout_secs", "must be greater than 0".into());

    let observability = &config.observability;
    check(
        LOG_LEVELS.contains(&observability.log_level.as_str()),
        "observability.log_level",
        format!("unknown level '{}'", observability.log_level),
    );
    check(
        LOG_FORMATS.contains(&observability.log_format.as_str()),
        "observability.log_format",
        format!("unknown format '{}'", observability.log_format),
    );
    check(
        !observability.metrics_enabled || observability.metrics_address.parse::<SocketAddr>().is_ok(),
        "observability.metrics_address",
        format!("'{}' is not a socket address", observability.metrics_address),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
