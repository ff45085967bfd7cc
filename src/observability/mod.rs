//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch engine, client multiplexer, HTTP host:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (plain or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Batch id and item id are attached to every dispatch event
//! - Metrics are cheap and recorded even when no exporter is installed

pub mod logging;
pub mod metrics;
