//! Metrics collection and exposition.
//!
//! # Metrics
//! - `search_transactions_total` (counter): finished transactions by
//!   resource and outcome (`committed`, `rolled_back`, `commit_failed`,
//!   `rollback_failed`)
//! - `search_endpoint_alive` (gauge): 1=alive, 0=zombie, per endpoint
//! - `search_close_failures_total` (counter): handles that failed to close
//!
//! # Design Decisions
//! - Labels are resource names and endpoint URLs, both bounded by config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_transaction(resource: &str, outcome: &'static str) {
    ::metrics::counter!(
        "search_transactions_total",
        "resource" => resource.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_endpoint_alive(endpoint: &str, alive: bool) {
    ::metrics::gauge!("search_endpoint_alive", "endpoint" => endpoint.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_close_failure(resource: &str) {
    ::metrics::counter!("search_close_failures_total", "resource" => resource.to_string()).increment(1);
}
