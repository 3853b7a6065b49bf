//! Generic key/value cache with per-entry expiry.
//!
//! Expiry is enforced twice: lazily on every read, and by a background sweep
//! that reclaims memory. Only the read-time check matters for correctness;
//! an entry past its deadline is never returned whether or not the sweep
//! has run.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::ShutdownSignal;

#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> TtlEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A thread-safe map whose entries expire after a time-to-live.
#[derive(Debug)]
pub struct ExpiringCache<K, V> {
    entries: RwLock<HashMap<K, TtlEntry<V>>>,
    default_ttl: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache. `default_ttl` applies to `set` calls made
    /// with `None` or a zero duration.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    fn resolve_ttl(&self, ttl: Option<Duration>) -> Duration {
        match ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => self.default_ttl,
        }
    }

    /// Insert or overwrite `key`, resetting its expiry.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + self.resolve_ttl(ttl);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, TtlEntry { value, expires_at });
    }

    /// Fetch a live entry.
    ///
    /// An expired entry reads as absent and is removed on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Another writer may have refreshed the key between the two locks.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    /// Unconditionally remove `key`.
    pub fn delete(&self, key: &K) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    /// Atomically read-modify-write one entry under the write lock.
    ///
    /// `f` receives the live value (or `None` if absent or expired) and
    /// returns the value to store, if any, together with a result passed
    /// back to the caller. Returning `None` for the value leaves the entry
    /// untouched.
    pub fn update<R, F>(&self, key: K, ttl: Option<Duration>, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R),
    {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let current = entries.get(&key).filter(|entry| !entry.is_expired(now));
        let (next, result) = f(current.map(|entry| &entry.value));

        if let Some(value) = next {
            let expires_at = now + self.resolve_ttl(ttl);
            entries.insert(key, TtlEntry { value, expires_at });
        }
        result
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();

        let expired: Vec<K> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect()
        };
        if expired.is_empty() {
            return 0;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for key in expired {
            // Skip keys refreshed since the scan.
            if entries.get(&key).is_some_and(|entry| entry.is_expired(now)) {
                entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    /// Spawn the background sweeper. It runs every `interval` until
    /// `shutdown` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.len(), "Swept expired cache entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Cache sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;

    #[tokio::test(start_paused = true)]
    async fn set_then_get_returns_value() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("k", 7, Some(Duration::from_secs(5)));
        assert_eq!(cache.get(&"k"), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_absent_before_any_sweep() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("k", 7, Some(Duration::from_secs(5)));

        time::advance(Duration::from_secs(5)).await;

        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty(), "lazy miss removes the entry");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_uses_default() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        cache.set("a", 1, Some(Duration::ZERO));
        cache.set("b", 2, None);

        time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), Some(2));

        time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_resets_expiry() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("k", 1, Some(Duration::from_secs(5)));
        time::advance(Duration::from_secs(4)).await;
        cache.set("k", 2, Some(Duration::from_secs(5)));
        time::advance(Duration::from_secs(4)).await;

        assert_eq!(cache.get(&"k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_removes_entry() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("k", 1, None);
        cache.delete(&"k");
        assert_eq!(cache.get(&"k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn update_sees_only_live_values() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("k", 1, Some(Duration::from_secs(1)));
        time::advance(Duration::from_secs(2)).await;

        let seen = cache.update("k", None, |current| (Some(10), current.copied()));
        assert_eq!(seen, None);
        assert_eq!(cache.get(&"k"), Some(10));

        let seen = cache.update("k", None, |current| (None, current.copied()));
        assert_eq!(seen, Some(10));
        assert_eq!(cache.get(&"k"), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_entries() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("short", 1, Some(Duration::from_secs(1)));
        cache.set("long", 2, Some(Duration::from_secs(100)));

        time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_interval_and_stops_on_shutdown() {
        let cache = Arc::new(ExpiringCache::new(Duration::from_secs(60)));
        cache.set("k", 1, Some(Duration::from_secs(1)));

        let shutdown = Shutdown::new();
        let handle = cache.spawn_sweeper(Duration::from_secs(10), shutdown.subscribe());

        time::sleep(Duration::from_secs(11)).await;
        assert!(cache.is_empty());

        shutdown.trigger();
        handle.await.unwrap();
    }
}
