//! Client identity checks: IP allow/deny lists and API keys.

use std::net::IpAddr;

use axum::http::HeaderMap;

use crate::config::{AuthConfig, GatewayConfig, SecurityConfig};
use crate::error::DenyReason;

/// Check a client address against the deny-list, then the allow-list.
///
/// An empty allow-list admits every address that is not denied.
pub fn check_client_ip(security: &SecurityConfig, ip: Option<IpAddr>) -> Result<(), DenyReason> {
    let ip = ip.map(|ip| ip.to_canonical()).ok_or(DenyReason::BadIp)?;

    if list_contains(&security.deny_ips, ip) {
        return Err(DenyReason::DeniedIp);
    }
    if !security.allow_ips.is_empty() && !list_contains(&security.allow_ips, ip) {
        return Err(DenyReason::NotAllowedIp);
    }
    Ok(())
}

fn list_contains(list: &[String], ip: IpAddr) -> bool {
    list.iter()
        .filter_map(|entry| entry.parse::<IpAddr>().ok())
        .any(|entry| entry.to_canonical() == ip)
}

/// Check the configured auth header against the accepted keys.
pub fn check_api_key(auth: &AuthConfig, headers: &HeaderMap) -> Result<(), DenyReason> {
    let key = headers
        .get(auth.header_name.as_str())
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(DenyReason::MissingKey)?;

    if auth.api_keys.iter().any(|accepted| accepted == key) {
        Ok(())
    } else {
        Err(DenyReason::InvalidKey)
    }
}

/// Full identity check: address first, then key.
pub fn check_identity(
    config: &GatewayConfig,
    ip: Option<IpAddr>,
    headers: &HeaderMap,
) -> Result<(), DenyReason> {
    check_client_ip(&config.security, ip)?;
    check_api_key(&config.auth, headers)
}
