//! Request metrics gate.

use std::sync::Arc;
use std::time::Instant;

use axum::{body::Body, http::Request};

use super::{Gate, Next, ResponseFuture};
use crate::config::ConfigStore;
use crate::error::Rejected;
use crate::http::request::client_ip;
use crate::observability::metrics;

/// Endpoint label for requests refused by an inner gate.
pub const REJECTED_ENDPOINT: &str = "rejected";

/// Records count, latency and outcome of every request that reaches it,
/// rejections by inner gates included. A no-op when metrics are disabled.
///
/// Refused requests are counted under [`REJECTED_ENDPOINT`] and get no
/// per-ip series, so unauthenticated clients cannot grow the label set.
pub struct ObservabilityGate {
    config: Arc<ConfigStore>,
}

impl ObservabilityGate {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }
}

impl Gate for ObservabilityGate {
    fn name(&self) -> &'static str {
        "observability"
    }

    fn call(&self, request: Request<Body>, next: Next) -> ResponseFuture {
        if !self.config.current().observability.metrics_enabled {
            return Box::pin(next.run(request));
        }

        let method = request.method().to_string();
        let endpoint = request.uri().path().to_string();
        let ip = client_ip(&request)
            .map(|ip| ip.to_canonical().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Box::pin(async move {
            let start = Instant::now();
            let response = next.run(request).await;
            let status = response.status().as_u16();

            if response.extensions().get::<Rejected>().is_some() {
                metrics::record_request(&method, REJECTED_ENDPOINT, status, start.elapsed());
                metrics::record_outcome(&method, REJECTED_ENDPOINT, status);
            } else {
                metrics::record_request(&method, &endpoint, status, start.elapsed());
                metrics::record_request_by_ip(&ip, &endpoint, status);
                metrics::record_outcome(&method, &endpoint, status);
            }
            response
        })
    }
}
