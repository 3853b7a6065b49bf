//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, endpoint, status
//! - `gateway_requests_duration_seconds` (histogram): latency by method, endpoint
//! - `gateway_requests_by_ip_total` (counter): requests by client ip, endpoint, status
//! - `gateway_requests_success_total` / `gateway_requests_failure_total` (counters)
//! - `gateway_api_keys_total`, `gateway_backends_total` (gauges)
//! - `gateway_backend_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_rate_limited_total`, `gateway_identity_denied_total` (counters)
//!
//! The Prometheus recorder is process-global and installed once; every
//! gateway instance in the process shares the same handle.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;

use crate::lifecycle::ShutdownSignal;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Latency buckets in seconds, matching the Prometheus client defaults.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the Prometheus recorder (first call only) and return its handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full("gateway_requests_duration_seconds".to_string()),
                    DURATION_BUCKETS,
                )
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Invalid histogram buckets; falling back to summaries");
                    PrometheusBuilder::new()
                });
            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Metrics recorder already installed; gateway metrics will not be exported");
            }
            handle
        })
        .clone()
}

pub fn record_request(method: &str, endpoint: &str, status: u16, elapsed: Duration) {
    let status = status.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "gateway_requests_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_request_by_ip(ip: &str, endpoint: &str, status: u16) {
    counter!(
        "gateway_requests_by_ip_total",
        "ip" => ip.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count a finished request as success (2xx) or failure (everything else).
pub fn record_outcome(method: &str, endpoint: &str, status: u16) {
    let name = if (200..300).contains(&status) {
        "gateway_requests_success_total"
    } else {
        "gateway_requests_failure_total"
    };
    counter!(name, "method" => method.to_string(), "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_identity_denied(reason: &'static str) {
    counter!("gateway_identity_denied_total", "reason" => reason).increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    gauge!("gateway_backend_healthy", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_config_totals(api_keys: usize, backends: usize) {
    gauge!("gateway_api_keys_total").set(api_keys as f64);
    gauge!("gateway_backends_total").set(backends as f64);
}

/// Periodically drain the recorder's histogram buffers until shutdown.
pub fn spawn_upkeep(
    handle: PrometheusHandle,
    interval: Duration,
    mut shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => handle.run_upkeep(),
                _ = shutdown.recv() => break,
            }
        }
    })
}
