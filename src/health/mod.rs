//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Tick
//!     → Snapshot pool (read lock)
//!     → Probe each backend, at most K in flight
//!     → Wait for the round, sleep for the interval
//!     → Each probe stores its result in that backend's health flag
//! ```
//!
//! # Design Decisions
//! - One flag per backend, set from the latest probe only
//! - A probe failure is logged and never propagated to callers
//! - Every probe has its own timeout so a hung backend only costs its slot

pub mod active;

pub use active::{HealthProber, ProbeOutcome};
