//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (IP deny/allow lists, then API key)
//!     → rate_limit.rs (per-IP sliding window)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-For)
//!     → Forward to backend
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any identity check failure
//! - Identity is checked before the rate limit, so rejected clients
//!   never consume window slots
//! - No trust in client input

pub mod access_control;
pub mod headers;
pub mod rate_limit;

pub use rate_limit::{SlidingWindowLimiter, WindowPolicy};
