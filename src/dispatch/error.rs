//! Error types of the dispatch engine.
//!
//! Two tiers:
//! - [`BatchError`]: the batch is malformed and nothing was dispatched
//! - [`ItemError`]: one call failed; it is reported in that call's result tuple
//!
//! Handlers fail with [`HandlerError`]. Everything that goes wrong while a
//! chain runs is first captured as a [`ChainError`] and then normalised into
//! an [`ItemError`].

use std::error::Error as StdError;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Message used for every failure whose details must not leak to callers.
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// Batch-level failure. The batch never reaches dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct BatchError {
    pub status: u16,
    pub message: String,
}

impl BatchError {
    /// A 400 batch error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }
}

/// Error returned by a route handler.
///
/// `status` defaults to 500. `code` and `data` are passed through to the
/// caller unchanged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub status: u16,
    pub code: Option<String>,
    pub data: Option<Map<String, Value>>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    /// A 500 error with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 500,
            code: None,
            data: None,
            source: None,
        }
    }

    /// The error produced for routes that are not registered.
    pub fn not_found() -> Self {
        Self::new("Not Found").with_status(404)
    }

    /// Wrap an arbitrary error, keeping it as the source.
    pub fn from_error(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
            ..Self::new(String::new())
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Messages of this error and every error in its source chain.
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![self.message.clone()];
        let mut next = StdError::source(self);
        while let Some(err) = next {
            let line = err.to_string();
            if lines.last() != Some(&line) {
                lines.push(line);
            }
            next = err.source();
        }
        lines
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(err).with_status(400)
    }
}

/// Error object placed in the fourth slot of a result tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemError {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

impl ItemError {
    /// The fixed `500 Internal Server Error` result.
    pub fn internal() -> Self {
        Self::default()
    }

    /// Normalise a handler error. The source chain is only attached when
    /// `expose_stack` is set.
    pub fn from_handler(err: &HandlerError, expose_stack: bool) -> Self {
        Self {
            message: if err.message.is_empty() {
                INTERNAL_SERVER_ERROR.to_string()
            } else {
                err.message.clone()
            },
            status: err.status,
            code: err.code.clone(),
            data: err.data.clone(),
            stack: expose_stack.then(|| err.trace()),
        }
    }
}

impl Default for ItemError {
    fn default() -> Self {
        Self {
            message: INTERNAL_SERVER_ERROR.to_string(),
            status: 500,
            code: None,
            data: None,
            stack: None,
        }
    }
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (status {})", self.message, self.status)
    }
}

/// Outcome of running a handler chain, other than a result object.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A handler returned an error.
    #[error(transparent)]
    Handler(HandlerError),

    /// More than one handler returned a result.
    #[error("multiple handlers returned results")]
    Conflict,

    /// No handler returned a result.
    #[error("no handler returned a result")]
    NoResult,

    /// The result was not a JSON object.
    #[error("the result is not an object")]
    NotAnObject,

    /// The chain did not finish before the route's deadline.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The task running the chain panicked or was aborted.
    #[error("handler task failed: {0}")]
    Aborted(String),
}

impl ChainError {
    /// Convert into the error reported to the caller.
    ///
    /// Only handler errors keep their details; every other failure becomes
    /// the fixed internal error.
    pub fn into_item_error(self, expose_stack: bool) -> ItemError {
        match self {
            Self::Handler(err) => ItemError::from_handler(&err, expose_stack),
            _ => ItemError::internal(),
        }
    }
}

/// Whether the process runs in a production environment.
///
/// Checks `ENVIRONMENT`, `APP_ENV` and `RUST_ENV`.
pub fn is_production() -> bool {
    ["ENVIRONMENT", "APP_ENV", "RUST_ENV"]
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|v| v.eq_ignore_ascii_case("production")))
}
