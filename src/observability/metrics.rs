//! Metrics collection and exposition.
//!
//! # Metrics
//! - `outbound_probe_total` (counter): probes by outbound and result
//! - `outbound_latency_ms` (gauge): latest successful latency per outbound
//! - `outbound_check_rounds_total` (counter): completed check rounds
//! - `outbound_failure_reports_total` (counter): failures reported by the data path
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is installed only by the binary

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Outcome label of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
    NoNetwork,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::Failure => "failure",
            ProbeOutcome::NoNetwork => "no_network",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(outbound: &str, outcome: ProbeOutcome, rtt_ms: Option<u16>) {
    counter!(
        "outbound_probe_total",
        "outbound" => outbound.to_string(),
        "result" => outcome.as_str()
    )
    .increment(1);
    if let Some(ms) = rtt_ms {
        gauge!("outbound_latency_ms", "outbound" => outbound.to_string()).set(f64::from(ms));
    }
}

pub fn record_check_round() {
    counter!("outbound_check_rounds_total").increment(1);
}

pub fn record_failure_report(outbound: &str) {
    counter!("outbound_failure_reports_total", "outbound" => outbound.to_string()).increment(1);
}
