//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chat_connections_total` (counter): accepted and admitted connections
//! - `chat_active_connections` (gauge): connections currently registered
//! - `chat_messages_relayed_total` (counter): messages read and broadcast
//! - `chat_deliveries_total` (counter): per-recipient writes, by `outcome`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    ::metrics::counter!("chat_connections_total").increment(1);
    ::metrics::gauge!("chat_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    ::metrics::gauge!("chat_active_connections").decrement(1.0);
}

/// Record one relayed message and the result of its fan-out.
pub fn record_relay(delivered: usize, failed: usize) {
    ::metrics::counter!("chat_messages_relayed_total").increment(1);
    ::metrics::counter!("chat_deliveries_total", "outcome" => "delivered").increment(delivered as u64);
    ::metrics::counter!("chat_deliveries_total", "outcome" => "failed").increment(failed as u64);
}
