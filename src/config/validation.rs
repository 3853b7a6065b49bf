//! Configuration validation.
//!
//! Serde handles the syntax; this module checks the values. All problems are
//! reported together so an operator can fix a file in one pass.

use std::net::IpAddr;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::GatewayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, backend) in config.backends.iter().enumerate() {
        match Url::parse(backend) {
            Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(
                format!("backends[{}]", i),
                format!("'{}' must be an http URL with a host", backend),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("backends[{}]", i),
                format!("'{}' is not a valid URL: {}", backend, e),
            )),
        }
    }

    let hc = &config.health_check;
    if hc.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }
    if hc.timeout_ms == 0 {
        errors.push(ValidationError::new("health_check.timeout_ms", "must be greater than 0"));
    }
    if hc.concurrency == 0 {
        errors.push(ValidationError::new("health_check.concurrency", "must be greater than 0"));
    }
    check_path(&mut errors, "health_check.path", &hc.path);

    let rl = &config.rate_limit;
    if rl.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be greater than 0"));
    }

    for (field, list) in [
        ("security.allow_ips", &config.security.allow_ips),
        ("security.deny_ips", &config.security.deny_ips),
    ] {
        for (i, ip) in list.iter().enumerate() {
            if ip.parse::<IpAddr>().is_err() {
                errors.push(ValidationError::new(
                    format!("{}[{}]", field, i),
                    format!("'{}' is not an IP address", ip),
                ));
            }
        }
    }

    if HeaderName::from_bytes(config.auth.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "auth.header_name",
            format!("'{}' is not a valid header name", config.auth.header_name),
        ));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    let endpoints = [
        ("observability.metrics_path", &config.observability.metrics_path),
        ("admin.reload_path", &config.admin.reload_path),
        ("admin.new_key_path", &config.admin.new_key_path),
    ];
    for (i, (field, path)) in endpoints.iter().enumerate() {
        check_path(&mut errors, field, path);
        if path.as_str() == "/" {
            errors.push(ValidationError::new(*field, "'/' is reserved for proxied traffic"));
        }
        if endpoints[..i].iter().any(|(_, earlier)| earlier == path) {
            errors.push(ValidationError::new(*field, format!("'{}' is already used by another endpoint", path)));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &str, path: &str) {
    if !path.starts_with('/') {
        errors.push(ValidationError::new(field, format!("'{}' must start with '/'", path)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn example_config_is_valid() {
        let config: GatewayConfig =
            toml::from_str(include_str!("../../gateway.example.toml")).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert!(config.rate_limit.enabled);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn endpoint_paths_must_be_distinct() {
        let mut config = GatewayConfig::default();
        config.admin.new_key_path = config.admin.reload_path.clone();
        config.observability.metrics_path = "/".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["observability.metrics_path", "admin.new_key_path"]);
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.backends = vec!["not a url".into(), "ftp://host:21".into()];
        config.security.allow_ips = vec!["10.0.0.300".into()];
        config.rate_limit.max_requests = 0;
        config.auth.header_name = "bad header".into();
        config.observability.metrics_path = "metrics".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "backends[0]",
                "backends[1]",
                "rate_limit.max_requests",
                "security.allow_ips[0]",
                "auth.header_name",
                "observability.metrics_path",
            ]
        );
    }
}
