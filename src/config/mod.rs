//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → store.rs (atomic swap of Arc<GatewayConfig>)
//!     → change listeners (server pool, rate limiter, logging, metrics)
//!
//! On reload (endpoint, SIGHUP or watcher.rs):
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → publish only on success; the old config stays live otherwise
//! ```
//!
//! # Design Decisions
//! - The store is an explicit object passed to every component, never a global
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{
    AdminConfig, AuthConfig, GatewayConfig, HealthCheckConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, SecurityConfig, TimeoutConfig,
};
pub use store::ConfigStore;
