//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server
//! and the client. All types derive Serde traits for deserialization from
//! config files, and every field has a default.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::routing::registry::RouterOptions;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BlestConfig {
    /// HTTP host settings.
    pub listener: ListenerConfig,

    /// Route registry options (default route timeout, introspection).
    pub router: RouterOptions,

    /// Client multiplexer settings.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP host configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
            request_timeout_secs: 30,
        }
    }
}

/// Client multiplexer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// URL batches are posted to.
    pub endpoint: String,

    /// Maximum number of calls per outbound batch.
    pub max_batch_size: usize,

    /// Debounce window in milliseconds.
    pub buffer_delay_ms: u64,

    /// Extra HTTP headers sent with every outbound batch.
    pub headers: HashMap<String, String>,

    /// Timeout of one outbound HTTP call in seconds.
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Default settings pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn buffer_delay(&self) -> Duration {
        Duration::from_millis(self.buffer_delay_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            max_batch_size: 25,
            buffer_delay_ms: 10,
            headers: HashMap::new(),
            timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format ("plain" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "plain".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
