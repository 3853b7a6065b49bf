//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the ordered set of backends
//! - Select the next healthy backend by round robin
//! - Swap the whole set on reconfiguration, keeping retained entries

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::GatewayError;
use crate::load_balancer::backend::BackendServer;

/// Round-robin pool of backends with per-entry health.
///
/// The server list is only ever replaced wholesale under the write lock.
/// The cursor is a free-running counter interpreted modulo the current
/// list length.
#[derive(Debug, Default)]
pub struct ServerPool {
    servers: RwLock<Vec<Arc<BackendServer>>>,
    cursor: AtomicUsize,
}

impl ServerPool {
    /// Create a pool from configured addresses. Every backend starts
    /// unhealthy until its first successful probe.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = Self::default();
        pool.set_servers(addresses);
        pool
    }

    /// Pick the next healthy backend.
    ///
    /// Scans at most one full rotation. Every step advances the shared
    /// cursor, so concurrent callers interleave rather than converge on the
    /// same entry.
    pub fn select_next(&self) -> Result<Arc<BackendServer>, GatewayError> {
        let servers = self.servers.read().unwrap_or_else(PoisonError::into_inner);
        let len = servers.len();

        for _ in 0..len {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
            let server = &servers[index];
            if server.is_healthy() {
                return Ok(server.clone());
            }
        }

        tracing::debug!(backend_count = len, "No healthy backends found in pool");
        Err(GatewayError::PoolExhausted)
    }

    /// Replace the backend list.
    ///
    /// Addresses present before keep their entry, so a probe round that
    /// holds an older snapshot still updates the live flag. New addresses
    /// start unhealthy. Order follows `addresses`, duplicates are dropped.
    pub fn set_servers<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut servers = self.servers.write().unwrap_or_else(PoisonError::into_inner);

        let mut previous: HashMap<String, Arc<BackendServer>> = servers
            .drain(..)
            .map(|s| (s.address().to_string(), s))
            .collect();
        let previous_len = previous.len();

        let mut next = Vec::new();
        let mut seen = HashSet::new();
        for address in addresses {
            let address = address.into();
            if !seen.insert(address.clone()) {
                continue;
            }
            let server = previous
                .remove(&address)
                .unwrap_or_else(|| Arc::new(BackendServer::new(address, false)));
            next.push(server);
        }

        tracing::info!(
            previous = previous_len,
            current = next.len(),
            removed = previous.len(),
            "Server pool reconfigured"
        );
        *servers = next;
    }

    /// Snapshot of the current backends (for health probing).
    pub fn snapshot(&self) -> Vec<Arc<BackendServer>> {
        self.servers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.servers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn healthy_count(&self) -> usize {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.is_healthy())
            .count()
    }

    /// Look up a backend by address.
    pub fn get(&self, address: &str) -> Option<Arc<BackendServer>> {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.address() == address)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://127.0.0.1:{}", 9000 + i)).collect()
    }

    fn mark_all(pool: &ServerPool, healthy: bool) {
        for server in pool.snapshot() {
            server.set_healthy(healthy);
        }
    }

    #[test]
    fn all_healthy_visits_each_server_once_per_rotation() {
        for n in 1..=5 {
            let pool = ServerPool::new(addresses(n));
            mark_all(&pool, true);

            let first: Vec<String> = (0..n)
                .map(|_| pool.select_next().unwrap().address().to_string())
                .collect();
            let mut sorted = first.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), n, "each server exactly once for n={}", n);

            let second: Vec<String> = (0..n)
                .map(|_| pool.select_next().unwrap().address().to_string())
                .collect();
            assert_eq!(first, second, "rotation order is fixed");
        }
    }

    #[test]
    fn single_healthy_server_always_selected() {
        let pool = ServerPool::new(addresses(4));
        pool.get("http://127.0.0.1:9002").unwrap().set_healthy(true);

        for _ in 0..10 {
            assert_eq!(pool.select_next().unwrap().address(), "http://127.0.0.1:9002");
        }
    }

    #[test]
    fn no_healthy_servers_exhausts_pool() {
        let pool = ServerPool::new(addresses(3));
        assert!(matches!(pool.select_next(), Err(GatewayError::PoolExhausted)));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.healthy_count(), 0);
    }

    #[test]
    fn empty_pool_exhausts_pool() {
        let pool = ServerPool::new(Vec::<String>::new());
        assert!(pool.is_empty());
        assert!(matches!(pool.select_next(), Err(GatewayError::PoolExhausted)));
    }

    #[test]
    fn set_servers_preserves_health_of_retained_addresses() {
        let pool = ServerPool::new(["http://a:1", "http://b:1", "http://c:1"]);
        pool.get("http://a:1").unwrap().set_healthy(true);
        pool.get("http://b:1").unwrap().set_healthy(false);

        pool.set_servers(["http://b:1", "http://a:1", "http://d:1", "http://a:1"]);

        let snapshot: Vec<(String, bool)> = pool
            .snapshot()
            .iter()
            .map(|s| (s.address().to_string(), s.is_healthy()))
            .collect();
        assert_eq!(
            snapshot,
            vec![
                ("http://b:1".to_string(), false),
                ("http://a:1".to_string(), true),
                ("http://d:1".to_string(), false),
            ]
        );
    }

    #[test]
    fn set_servers_keeps_entries_of_retained_addresses() {
        let pool = ServerPool::new(["http://a:1", "http://b:1"]);
        let a = pool.get("http://a:1").unwrap();

        pool.set_servers(["http://a:1", "http://c:1"]);
        assert!(Arc::ptr_eq(&a, &pool.get("http://a:1").unwrap()));

        // A result written through the old handle reaches the live pool.
        a.set_healthy(true);
        assert!(pool.get("http://a:1").unwrap().is_healthy());
        assert_eq!(pool.healthy_count(), 1);
    }

    #[test]
    fn selection_skips_unhealthy_servers() {
        let pool = ServerPool::new(["http://a:1", "http://b:1", "http://c:1"]);
        pool.get("http://a:1").unwrap().set_healthy(true);
        pool.get("http://c:1").unwrap().set_healthy(true);

        let picks: Vec<String> = (0..4)
            .map(|_| pool.select_next().unwrap().address().to_string())
            .collect();
        assert!(picks.iter().all(|p| p != "http://b:1"));
        assert!(picks.contains(&"http://a:1".to_string()));
        assert!(picks.contains(&"http://c:1".to_string()));
    }

    #[test]
    fn concurrent_selection_spreads_load() {
        let pool = Arc::new(ServerPool::new(addresses(4)));
        mark_all(&pool, true);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| pool.select_next().unwrap().address().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for address in handle.join().unwrap() {
                *counts.entry(address).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 100));
    }
}
