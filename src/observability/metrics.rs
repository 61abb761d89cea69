//! Metrics collection and exposition.
//!
//! # Metrics
//! - `socket_router_dispatch_total` (counter): routed messages by outcome and verb
//! - `socket_router_frames_total` (counter): inbound frames by kind
//! - `socket_router_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is optional and installed once at startup

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::Verb;

pub const DISPATCH_TOTAL: &str = "socket_router_dispatch_total";
pub const FRAMES_TOTAL: &str = "socket_router_frames_total";
pub const ACTIVE_CONNECTIONS: &str = "socket_router_active_connections";

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one dispatch attempt.
pub fn record_dispatch(outcome: &'static str, verb: Option<Verb>) {
    let verb = verb.map(|v| v.as_str()).unwrap_or("none");
    ::metrics::counter!(DISPATCH_TOTAL, "outcome" => outcome, "verb" => verb).increment(1);
}

/// Count one inbound frame (`text`, `binary`, `invalid`).
pub fn record_frame(kind: &'static str) {
    ::metrics::counter!(FRAMES_TOTAL, "kind" => kind).increment(1);
}

pub fn connection_opened() {
    ::metrics::gauge!(ACTIVE_CONNECTIONS).increment(1.0);
}

pub fn connection_closed() {
    ::metrics::gauge!(ACTIVE_CONNECTIONS).decrement(1.0);
}
