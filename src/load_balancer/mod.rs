//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted by the pipeline
//!     → pool.rs select_next() (round robin over healthy backends)
//!     → backend.rs (address + atomic health flag)
//!     → Return backend or PoolExhausted
//!
//! Health prober → backend.rs set_healthy()
//! Config reload → pool.rs set_servers()
//! ```
//!
//! # Design Decisions
//! - Structural changes take the pool's write lock; health flags never do
//! - Unhealthy backends excluded from selection
//! - New backends start unhealthy until probed

pub mod backend;
pub mod pool;

pub use backend::BackendServer;
pub use pool::ServerPool;
