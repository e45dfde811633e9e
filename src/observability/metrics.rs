//! Metrics collection and exposition.
//!
//! # Metrics
//! - `server_connections_accepted_total` (counter)
//! - `server_active_connections` (gauge): current in-flight connections
//! - `server_shutdowns_total` (counter): by outcome
//! - `server_drain_duration_seconds` (histogram)
//!
//! Recording goes through the `metrics` facade and is a no-op until an
//! exporter is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn connection_opened(active: u64) {
    counter!("server_connections_accepted_total").increment(1);
    gauge!("server_active_connections").set(active as f64);
}

pub fn connection_closed(active: u64) {
    gauge!("server_active_connections").set(active as f64);
}

pub fn record_shutdown(outcome: &'static str, elapsed: Duration) {
    counter!("server_shutdowns_total", "outcome" => outcome).increment(1);
    histogram!("server_drain_duration_seconds").record(elapsed.as_secs_f64());
}
