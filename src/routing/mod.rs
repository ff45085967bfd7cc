//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     name + handler(s)
//!     → validate.rs (route-name grammar)
//!     → registry.rs (wrap with current middleware/afterware, store)
//!
//! Composition:
//!     other registry
//!     → registry.rs merge / namespace (collision check, copy, re-wrap)
//! ```
//!
//! # Design Decisions
//! - Routes are keyed by exact name; no pattern matching at dispatch time
//! - Handler arity is fixed by the `Handler` trait, so it is checked by the compiler
//! - Lookup of unknown names is not an error here; dispatch answers 404

pub mod handler;
pub mod registry;
pub mod validate;

pub use handler::{handler, BoxedHandler, Handler, HandlerChain, HandlerResult};
pub use registry::{RegistryError, Route, RouteDescription, Router, RouterOptions, DEFAULT_TIMEOUT_MS};
pub use validate::{validate_route_name, RouteNameError};
