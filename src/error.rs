//! Gateway error taxonomy.
//!
//! Every rejection the gateway produces on the request path maps onto one
//! variant here, and each variant knows its HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Why the identity gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The client address could not be determined or parsed.
    BadIp,
    /// The client address is on the deny-list.
    DeniedIp,
    /// The allow-list is non-empty and does not contain the client address.
    NotAllowedIp,
    /// The configured auth header is absent or empty.
    MissingKey,
    /// The supplied key is not one of the configured API keys.
    InvalidKey,
}

impl DenyReason {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::BadIp => "bad_ip",
            DenyReason::DeniedIp => "denied_ip",
            DenyReason::NotAllowedIp => "not_allowed_ip",
            DenyReason::MissingKey => "missing_key",
            DenyReason::InvalidKey => "invalid_key",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DenyReason::BadIp | DenyReason::DeniedIp | DenyReason::NotAllowedIp => {
                StatusCode::FORBIDDEN
            }
            DenyReason::MissingKey | DenyReason::InvalidKey => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response extension set on requests a gate refused before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected;

/// Top-level error type for the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no healthy backend servers available")]
    PoolExhausted,

    #[error("identity check failed: {0}")]
    IdentityDenied(DenyReason),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("upstream request to {backend} failed: {message}")]
    Upstream { backend: String, message: String },

    #[error("upstream request to {backend} timed out")]
    UpstreamTimeout { backend: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Config(_) | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::IdentityDenied(reason) => reason.status(),
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let rejected = matches!(self, GatewayError::IdentityDenied(_) | GatewayError::RateLimited);
        let body = match &self {
            GatewayError::IdentityDenied(reason) if reason.status() == StatusCode::FORBIDDEN => {
                "Unauthorized IP".to_string()
            }
            GatewayError::IdentityDenied(_) => "Unauthorized API Key".to_string(),
            GatewayError::RateLimited => "Rate limit exceeded".to_string(),
            GatewayError::PoolExhausted => "No healthy backends".to_string(),
            GatewayError::Upstream { .. } => "Upstream request failed".to_string(),
            GatewayError::UpstreamTimeout { .. } => "Upstream request timed out".to_string(),
            other => other.to_string(),
        };
        let mut response = (self.status(), body).into_response();
        if rejected {
            response.extensions_mut().insert(Rejected);
        }
        response
    }
}
