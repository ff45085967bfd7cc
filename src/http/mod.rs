//! HTTP host for the dispatch engine.
//!
//! # Data Flow
//! ```text
//! POST / (JSON batch)
//!     → server.rs (Axum setup, request ID, limits, CORS)
//!     → request.rs (base context from HTTP headers)
//!     → Router::handle
//!     → 200 + result tuples, or batch error status + {status, message}
//! ```

pub mod request;
pub mod server;

pub use request::{request_context, HTTP_HEADERS, HTTP_REQUEST_ID, X_REQUEST_ID};
pub use server::HttpServer;
