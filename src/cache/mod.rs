//! In-memory caching.
//!
//! # Data Flow
//! ```text
//! Writer (rate limiter) → set()/update() → entry with expires_at
//! Reader → get() → live value, or miss once expires_at has passed
//! Background sweeper → sweep() every interval → expired keys dropped
//! ```
//!
//! # Design Decisions
//! - One RwLock over the whole map; the cache holds one entry per client
//! - Read-time expiry is authoritative; the sweep only reclaims memory
//! - Sweeper owns a shutdown signal instead of running until process exit

pub mod expiring;

pub use expiring::ExpiringCache;
