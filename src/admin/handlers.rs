use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::keys::{generate_key, API_KEY_LENGTH};
use crate::http::server::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Re-read the configuration file and publish it.
pub async fn reload_config(state: AppState) -> Response {
    let store = state.config.clone();
    let result = tokio::task::spawn_blocking(move || store.reload())
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    match result {
        Ok(config) => {
            tracing::info!(backends = config.backends.len(), "Config reloaded successfully");
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload the config file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to reload the config file: {}", e),
            )
                .into_response()
        }
    }
}

/// Mint a new API key, persist it and return it as the body.
pub async fn new_key(state: AppState) -> Response {
    let key = generate_key(API_KEY_LENGTH);
    let store = state.config.clone();
    let persisted = key.clone();
    let result = tokio::task::spawn_blocking(move || store.add_api_key(persisted))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    match result {
        Ok(config) => {
            tracing::info!(api_keys = config.auth.api_keys.len(), "New API key generated");
            (StatusCode::OK, key).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to persist the new API key");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to persist the new API key: {}", e),
            )
                .into_response()
        }
    }
}

/// Prometheus text exposition. Not gated.
pub async fn metrics(State(state): State<AppState>) -> Response {
    if !state.config.current().observability.metrics_enabled {
        return (StatusCode::SERVICE_UNAVAILABLE, "Metrics are disabled").into_response();
    }
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
        .into_response()
}
