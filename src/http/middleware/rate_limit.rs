//! Per-client rate limiting gate.

use std::sync::Arc;

use axum::{body::Body, http::Request, response::IntoResponse};

use super::{Gate, Next, ResponseFuture};
use crate::config::ConfigStore;
use crate::error::GatewayError;
use crate::http::request::{client_ip, request_id};
use crate::observability::metrics;
use crate::security::SlidingWindowLimiter;

/// Answers 429 once a client address exceeds the sliding-window limit.
///
/// Disabled configurations pass every request through without touching
/// the limiter. Requests whose address cannot be resolved share the
/// `"unknown"` bucket.
pub struct RateLimitGate {
    config: Arc<ConfigStore>,
    limiter: Arc<SlidingWindowLimiter>,
}

impl RateLimitGate {
    pub fn new(config: Arc<ConfigStore>, limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { config, limiter }
    }
}

impl Gate for RateLimitGate {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn call(&self, request: Request<Body>, next: Next) -> ResponseFuture {
        if !self.config.current().rate_limit.enabled {
            return Box::pin(next.run(request));
        }

        let client = client_ip(&request)
            .map(|ip| ip.to_canonical().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if self.limiter.check(&client) {
            tracing::warn!(request_id = %request_id(&request), client = %client, "Rate limit exceeded");
            metrics::record_rate_limited();
            let response = GatewayError::RateLimited.into_response();
            return Box::pin(async move { response });
        }

        tracing::debug!(request_id = %request_id(&request), client = %client, "Forwarding request");
        Box::pin(next.run(request))
    }
}
