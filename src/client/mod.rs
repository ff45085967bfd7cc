//! Client multiplexer.
//!
//! # Data Flow
//! ```text
//! many call sites → HttpClient::request (pending table + queue)
//!     → batcher task (flush when full or buffer_delay_ms after first call)
//!     → transport.rs (one outbound batch per chunk)
//!     → result tuples demultiplexed back to waiters by id
//! ```

pub mod error;
pub mod multiplexer;
pub mod transport;

pub use error::{ClientError, TransportError};
pub use multiplexer::{HttpClient, PendingCall};
pub use transport::{HttpTransport, Transport};
