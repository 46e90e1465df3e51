//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_rate_limited_total` (counter): requests rejected with 429
//! - `proxy_target_health` (gauge): 1=healthy, 0=unhealthy
//! - `proxy_config_reloads_total` (counter): reloads by outcome
//!
//! Values live in memory only. Without an installed recorder every call is a
//! no-op, which is what unit tests see.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("proxy_rate_limited_total").increment(1);
}

pub fn record_target_health(target: &str, healthy: bool) {
    metrics::gauge!("proxy_target_health", "target" => target.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_config_reload(outcome: &'static str) {
    metrics::counter!("proxy_config_reloads_total", "outcome" => outcome).increment(1);
}
