//! Batched RPC: dispatch engine, client multiplexer and HTTP host.
//!
//! A batch is a JSON array of `[id, route, body?, headers-or-selector?]`
//! tuples. [`Router::handle`] runs every call concurrently through its
//! route's handler chain and answers with `[id, route, result, error]`
//! tuples in input order. [`HttpClient`] does the reverse: it gathers
//! independent calls into batches and routes each result back to its caller.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod projection;
pub mod routing;

pub use client::{ClientError, HttpClient, PendingCall};
pub use config::schema::BlestConfig;
pub use dispatch::{BatchError, Context, HandlerError, ItemError, ResultItem};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use projection::project;
pub use routing::{handler, HandlerResult, Router, RouterOptions};
