//! IP allow/deny and API key gate.

use std::sync::Arc;

use axum::{body::Body, http::Request, response::IntoResponse};

use super::{Gate, Next, ResponseFuture};
use crate::config::ConfigStore;
use crate::error::GatewayError;
use crate::http::request::{client_ip, request_id};
use crate::observability::metrics;
use crate::security::access_control::check_identity;

/// Rejects requests from disallowed addresses (403) or without a
/// configured API key (401). Reads the live configuration per request.
pub struct IdentityGate {
    config: Arc<ConfigStore>,
}

impl IdentityGate {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }
}

impl Gate for IdentityGate {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn call(&self, request: Request<Body>, next: Next) -> ResponseFuture {
        let config = self.config.current();
        let ip = client_ip(&request);

        if let Err(reason) = check_identity(&config, ip, request.headers()) {
            tracing::warn!(
                request_id = %request_id(&request),
                client = ?ip,
                reason = %reason,
                "Request denied by identity check"
            );
            metrics::record_identity_denied(reason.as_str());
            let response = GatewayError::IdentityDenied(reason).into_response();
            return Box::pin(async move { response });
        }

        Box::pin(next.run(request))
    }
}
