//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): requests by admission outcome
//! - `gate_slots_in_use` (gauge): connection slots currently held
//! - `gate_rate_wait_seconds` (histogram): time spent waiting for a rate permit
//! - `gate_forward_duration_seconds` (histogram): forward call latency
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus
//! recorder.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the global Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Count one terminal admission outcome.
pub fn record_outcome(outcome: &'static str) {
    counter!("gate_requests_total", "outcome" => outcome).increment(1);
}

pub fn slot_acquired() {
    gauge!("gate_slots_in_use").increment(1.0);
}

pub fn slot_released() {
    gauge!("gate_slots_in_use").decrement(1.0);
}

pub fn record_rate_wait(waited: Duration) {
    histogram!("gate_rate_wait_seconds").record(waited.as_secs_f64());
}

pub fn record_forward(start: Instant, status: u16) {
    histogram!("gate_forward_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}
