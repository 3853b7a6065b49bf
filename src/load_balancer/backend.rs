//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single inference server
//! - Track health state, written by the prober and read by selection

use std::sync::atomic::{AtomicBool, Ordering};

/// A single backend server.
///
/// The health flag is an independent atomic: neither the prober nor the
/// selector needs the pool's structural lock to touch it.
#[derive(Debug)]
pub struct BackendServer {
    /// Base URL of the backend, as configured.
    address: String,
    healthy: AtomicBool,
}

impl BackendServer {
    /// Create a backend with an explicit initial health state.
    pub fn new(address: impl Into<String>, healthy: bool) -> Self {
        Self {
            address: address.into(),
            healthy: AtomicBool::new(healthy),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Return true if the most recent probe succeeded.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Record a probe outcome. Returns the previous state.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_healthy_reports_transition() {
        let backend = BackendServer::new("http://127.0.0.1:11434", false);
        assert!(!backend.is_healthy());

        assert!(!backend.set_healthy(true));
        assert!(backend.is_healthy());
        assert!(backend.set_healthy(true));
    }
}
