//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blest_batches_total` (counter): batches by outcome (`completed`, `rejected`)
//! - `blest_batch_duration_seconds` (histogram): time to resolve a whole batch
//! - `blest_batch_items` (histogram): items per accepted batch
//! - `blest_items_total` (counter): calls by route and status
//! - `blest_item_duration_seconds` (histogram): per-call latency by route
//! - `blest_client_chunks_total` (counter): outbound client chunks by outcome
//! - `blest_client_chunk_size` (histogram): calls per outbound chunk
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

/// Record a resolved or rejected batch.
pub fn record_batch(outcome: &'static str, items: usize, started: Instant) {
    metrics::counter!("blest_batches_total", "outcome" => outcome).increment(1);
    metrics::histogram!("blest_batch_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
    if outcome != "rejected" {
        metrics::histogram!("blest_batch_items").record(items as f64);
    }
}

/// Record the terminal status of one call.
pub fn record_item(route: &str, status: u16, started: Instant) {
    let route = route.to_string();
    metrics::counter!("blest_items_total", "route" => route.clone(), "status" => status.to_string()).increment(1);
    metrics::histogram!("blest_item_duration_seconds", "route" => route).record(started.elapsed().as_secs_f64());
}

/// Record one outbound client chunk.
pub fn record_client_chunk(outcome: &'static str, calls: usize) {
    metrics::counter!("blest_client_chunks_total", "outcome" => outcome).increment(1);
    metrics::histogram!("blest_client_chunk_size").record(calls as f64);
}
