//! Administrative endpoints: config reload, key minting and metrics.
//!
//! Reload and new-key run behind the full gate pipeline, so they need a
//! valid API key from an admitted address. The metrics endpoint is open.

pub mod handlers;
pub mod keys;

use axum::{body::Body, http::Request, routing::get, Router};

use crate::http::middleware::{handler_fn, MiddlewarePipeline};
use crate::http::server::{endpoint, AppState};

pub use keys::{generate_key, API_KEY_LENGTH};

/// Routes for the admin endpoints at the paths configured at startup.
pub fn admin_router(state: AppState, pipeline: &MiddlewarePipeline) -> Router<AppState> {
    let config = state.config.current();

    let reload_state = state.clone();
    let reload = pipeline.apply(handler_fn(move |_request: Request<Body>| {
        handlers::reload_config(reload_state.clone())
    }));

    let key_state = state;
    let new_key = pipeline.apply(handler_fn(move |_request: Request<Body>| {
        handlers::new_key(key_state.clone())
    }));

    Router::new()
        .route(&config.admin.reload_path, get(endpoint(reload)))
        .route(&config.admin.new_key_path, get(endpoint(new_key)))
        .route(&config.observability.metrics_path, get(handlers::metrics))
}
