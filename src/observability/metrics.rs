//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_cache_lookups_total` (counter): cache lookups by result
//! - `proxy_cache_evictions_total` (counter): expired entries swept
//! - `proxy_cache_invalidations_total` (counter): invalidations by outcome
//! - `replication_cycles_total` (counter): cycles by outcome and stage
//! - `replication_records_applied` (gauge): rows in the last snapshot
//! - `replication_cycle_duration_seconds` (histogram)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
/// Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    metrics::counter!("proxy_requests_total", &labels).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_evictions(count: usize) {
    metrics::counter!("proxy_cache_evictions_total").increment(count as u64);
}

pub fn record_cache_invalidation(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("proxy_cache_invalidations_total", "outcome" => outcome).increment(1);
}

pub fn record_replication_success(records: usize, start: Instant) {
    metrics::counter!("replication_cycles_total", "outcome" => "ok", "stage" => "done").increment(1);
    metrics::gauge!("replication_records_applied").set(records as f64);
    metrics::histogram!("replication_cycle_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_replication_failure(stage: &'static str) {
    metrics::counter!("replication_cycles_total", "outcome" => "error", "stage" => stage).increment(1);
}
