//! Sliding-window rate limiting per client.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::ExpiringCache;
use crate::config::RateLimitConfig;
use crate::lifecycle::ShutdownSignal;

/// Default lifetime of cache entries written without an explicit TTL.
const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(60 * 60);

/// Limits applied by [`SlidingWindowLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Requests admitted within one window.
    pub max_requests: usize,
    /// Window length.
    pub window: Duration,
    /// How long a client's entry is kept after its last admitted request.
    /// Never shorter than `window`.
    pub retention: Duration,
}

impl WindowPolicy {
    pub fn new(max_requests: usize, window: Duration, retention: Duration) -> Self {
        Self {
            max_requests,
            window,
            retention: retention.max(window),
        }
    }
}

impl From<&RateLimitConfig> for WindowPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            Duration::from_secs(config.retention_secs),
        )
    }
}

/// Per-client sliding-window limiter.
///
/// Each client key maps to the instants of its admitted requests that are
/// still inside the window. A check filters that list, rejects if it is
/// full, and otherwise appends `now`. The stored list therefore never holds
/// more than `max_requests` instants.
pub struct SlidingWindowLimiter {
    windows: Arc<ExpiringCache<String, Vec<Instant>>>,
    policy: ArcSwap<WindowPolicy>,
}

impl SlidingWindowLimiter {
    pub fn new(policy: WindowPolicy) -> Self {
        Self {
            windows: Arc::new(ExpiringCache::new(DEFAULT_ENTRY_TTL)),
            policy: ArcSwap::from_pointee(policy),
        }
    }

    pub fn policy(&self) -> WindowPolicy {
        **self.policy.load()
    }

    /// Swap in new limits. Existing client histories are kept and judged
    /// against the new window on their next check.
    pub fn set_policy(&self, policy: WindowPolicy) {
        if self.policy() != policy {
            tracing::info!(
                max_requests = policy.max_requests,
                window_secs = policy.window.as_secs(),
                "Rate limit policy updated"
            );
        }
        self.policy.store(Arc::new(policy));
    }

    /// Returns `true` if the request must be rejected.
    ///
    /// A rejected request is not recorded. The read-filter-write runs under
    /// the cache's write lock, so checks for one client are linearized.
    pub fn check(&self, client_key: &str) -> bool {
        let policy = self.policy();
        let now = Instant::now();
        let window_start = now.checked_sub(policy.window);

        self.windows
            .update(client_key.to_string(), Some(policy.retention), |current| {
                let mut valid: Vec<Instant> = current
                    .map(|requests| {
                        requests
                            .iter()
                            .copied()
                            .filter(|t| window_start.map_or(true, |start| *t > start))
                            .collect()
                    })
                    .unwrap_or_default();

                if valid.len() >= policy.max_requests {
                    return (None, true);
                }
                valid.push(now);
                (Some(valid), false)
            })
    }

    /// Number of recorded requests for a client (expired ones included
    /// until the next check filters them).
    pub fn tracked_requests(&self, client_key: &str) -> usize {
        self.windows
            .get(&client_key.to_string())
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// Number of clients with a live or not-yet-swept entry.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Start the background sweep over expired client entries.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: ShutdownSignal) -> JoinHandle<()> {
        self.windows.spawn_sweeper(interval, shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn limiter(max_requests: usize, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(WindowPolicy::new(
            max_requests,
            Duration::from_secs(window_secs),
            Duration::from_secs(600),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn limits_after_max_requests_and_recovers_after_window() {
        let rl = limiter(3, 10);

        assert!(!rl.check("10.0.0.1"));
        time::advance(Duration::from_secs(1)).await;
        assert!(!rl.check("10.0.0.1"));
        time::advance(Duration::from_secs(1)).await;
        assert!(!rl.check("10.0.0.1"));
        time::advance(Duration::from_secs(1)).await;
        assert!(rl.check("10.0.0.1"), "4th request within the window is limited");

        time::advance(Duration::from_secs(10)).await;
        assert!(!rl.check("10.0.0.1"), "window elapsed");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_requests_are_not_recorded() {
        let rl = limiter(2, 10);
        assert!(!rl.check("c"));
        assert!(!rl.check("c"));
        assert!(rl.check("c"));
        assert!(rl.check("c"));
        assert_eq!(rl.tracked_requests("c"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_per_request() {
        let rl = limiter(2, 10);
        assert!(!rl.check("c"));
        time::advance(Duration::from_secs(6)).await;
        assert!(!rl.check("c"));
        time::advance(Duration::from_secs(5)).await;

        // The first request left the window, the second has not.
        assert!(!rl.check("c"));
        assert!(rl.check("c"));
        assert_eq!(rl.tracked_requests("c"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clients_are_independent() {
        let rl = limiter(1, 60);
        assert!(!rl.check("a"));
        assert!(rl.check("a"));
        assert!(!rl.check("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_retention() {
        let rl = limiter(5, 10);
        assert!(!rl.check("c"));
        assert_eq!(rl.tracked_clients(), 1);

        time::advance(Duration::from_secs(600)).await;
        assert_eq!(rl.tracked_requests("c"), 0);
        assert_eq!(rl.tracked_clients(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn policy_update_applies_to_next_check() {
        let rl = limiter(1, 60);
        assert!(!rl.check("c"));
        assert!(rl.check("c"));

        rl.set_policy(WindowPolicy::new(3, Duration::from_secs(60), Duration::from_secs(600)));
        assert!(!rl.check("c"));
        assert!(!rl.check("c"));
        assert!(rl.check("c"));
    }

    #[test]
    fn retention_never_shorter_than_window() {
        let policy = WindowPolicy::new(1, Duration::from_secs(900), Duration::from_secs(600));
        assert_eq!(policy.retention, Duration::from_secs(900));
    }
}
