//! Inference gateway library.
//!
//! A reverse proxy that spreads requests over a pool of model-serving
//! backends, admitting them through IP, API key and rate-limit gates.

pub mod admin;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod security;

pub use config::{ConfigStore, GatewayConfig};
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
