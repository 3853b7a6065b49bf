//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for reading from and writing back to the
//! TOML config file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URLs of the inference backends (e.g. "http://10.0.0.5:11434").
    pub backends: Vec<String>,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Sliding-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// IP allow/deny lists.
    pub security: SecurityConfig,

    /// API key authentication.
    pub auth: AuthConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Paths of the management endpoints.
    pub admin: AdminConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path appended to each backend address when probing.
    pub path: String,

    /// Pause between the end of one probe round and the start of the next.
    pub interval_secs: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Maximum number of probes in flight at once.
    pub concurrency: usize,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval_secs: 10,
            timeout_ms: 2000,
            concurrency: 10,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests admitted per client within one window.
    pub max_requests: usize,

    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// How long a client's bookkeeping entry outlives its last admitted request.
    pub retention_secs: u64,

    /// Interval of the background sweep over expired client entries.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 60,
            window_secs: 60,
            retention_secs: 600,
            sweep_interval_secs: 900,
        }
    }
}

/// IP based access control.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// When non-empty, only these addresses are admitted.
    pub allow_ips: Vec<String>,

    /// Addresses that are always rejected.
    pub deny_ips: Vec<String>,
}

/// API key authentication.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Request header carrying the API key.
    pub header_name: String,

    /// Accepted API keys.
    pub api_keys: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header_name: "X-API-Key".to_string(),
            api_keys: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit log output at all.
    pub logging: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record request metrics and serve them on `metrics_path`.
    pub metrics_enabled: bool,

    /// Path of the Prometheus scrape endpoint.
    pub metrics_path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging: true,
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
        }
    }
}

/// Management endpoint paths.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    pub reload_path: String,
    pub new_key_path: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            reload_path: "/config/reload".to_string(),
            new_key_path: "/config/new-key".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a proxied request to receive the backend's response
    /// head. Re-read per request.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        // Inference responses can take minutes to stream.
        Self { request_secs: 300 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            backends = ["http://127.0.0.1:11434"]

            [auth]
            api_keys = ["k1"]
            "#,
        )
        .unwrap();

        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.auth.header_name, "X-API-Key");
        assert_eq!(config.auth.api_keys, vec!["k1".to_string()]);
        assert_eq!(config.health_check.concurrency, 10);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.observability.metrics_path, "/metrics");
        assert_eq!(config.admin.reload_path, "/config/reload");
    }

    #[test]
    fn document_round_trips_through_toml() {
        let mut config = GatewayConfig::default();
        config.backends.push("http://10.0.0.1:11434".into());
        config.security.deny_ips.push("10.0.0.9".into());

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: GatewayConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
