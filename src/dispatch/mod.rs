//! Dispatch engine.
//!
//! # Data Flow
//! ```text
//! inbound batch (JSON) + base context
//!     → batch.rs (shape validation, typed items)     ── malformed → BatchError (400)
//!     → engine.rs (resolve route, one task per item, per-route deadline)
//!         → context.rs (isolated per-call context)
//!         → handler chain (middleware → handlers → afterware)
//!         → error.rs (normalise failures into ItemError)
//!     → projection (optional selector)
//!     → results, in input order
//! ```

pub mod batch;
pub mod context;
pub mod engine;
pub mod error;

pub use batch::{parse_batch, validate_batch_shape, BatchItem, CallItem, ResultItem};
pub use context::Context;
pub use error::{BatchError, HandlerError, ItemError};
