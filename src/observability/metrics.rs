//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_admitted_total` (counter): requests that passed the
//!   rate limiter
//! - `gateway_requests_rejected_total` (counter): rejections by `reason`
//! - `gateway_admission_windows` (gauge): live windows after a sweep
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admitted() {
    metrics::counter!("gateway_requests_admitted_total").increment(1);
}

pub fn record_rejected(reason: &'static str) {
    metrics::counter!("gateway_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_window_count(count: usize) {
    metrics::gauge!("gateway_admission_windows").set(count as f64);
}
