//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/ (observability → identity → rate limit)
//!     → proxy.rs (pick backend, rewrite, stream)  or  admin handlers
//!     → Send to client
//! ```

pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;

pub use middleware::{Gate, MiddlewarePipeline, Next};
pub use proxy::GatewayHandler;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
