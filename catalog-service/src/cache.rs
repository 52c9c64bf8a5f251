//! Cache-aside store for aggregate row counts
//!
//! [`CountCache`] maps a string key to a previously computed count with a
//! time-based expiry. Reads honor the TTL on their own; the background sweep
//! only reclaims memory held by entries that have already expired.
//!
//! Concurrent misses on the same key are not serialized: each caller may
//! recompute and store the count, and the last write wins. Totals are
//! therefore eventually consistent within one TTL window.
//!
//! # Example
//!
//! ```rust
//! use catalog_service::cache::{CountCache, COUNT_TTL};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = CountCache::new();
//! assert_eq!(cache.get("products__count"), None);
//!
//! cache.set("products__count", 42, COUNT_TTL);
//! assert_eq!(cache.get("products__count"), Some(42));
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifetime of a cached count
pub const COUNT_TTL: Duration = Duration::from_secs(3 * 60);

/// Cache key for the total number of products
pub const PRODUCT_COUNT_KEY: &str = "products__count";

/// Cache key for the total number of categories
pub const CATEGORY_COUNT_KEY: &str = "categories__count";

/// Shortest period the background sweep will run at
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    count: i64,
    recorded_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.recorded_at) < self.ttl
    }
}

/// Shared key to count cache with per-entry expiry
///
/// Cloning is cheap; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct CountCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl CountCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached count for `key`, or `None` when never set or expired
    pub fn get(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.count)
    }

    /// Store `count` under `key`, overwriting any previous value and resetting its clock
    pub fn set(&self, key: impl Into<String>, count: i64, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                count,
                recorded_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Return the cached count, or compute, store, and return it on a miss
    ///
    /// No lock is held while `compute` runs. A failed computation leaves the
    /// cache untouched.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<i64, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<i64, E>>,
    {
        if let Some(count) = self.get(key) {
            tracing::trace!(key, count, "Count cache hit");
            return Ok(count);
        }

        tracing::debug!(key, "Count cache miss, computing from store");
        let count = compute().await?;
        self.set(key, count, ttl);
        Ok(count)
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of physically stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn the background sweep on the current Tokio runtime
    ///
    /// A zero `interval` is raised to [`MIN_SWEEP_INTERVAL`].
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let cache = self.clone();
        let token = CancellationToken::new();
        let child = token.child_token();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, "Swept expired count cache entries");
                        }
                    }
                }
            }
            tracing::debug!("Count cache sweeper stopped");
        });

        SweeperHandle { token, handle }
    }
}

/// Handle to a running background sweep
#[derive(Debug)]
pub struct SweeperHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep and wait for the task to finish
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Count cache sweeper task ended abnormally");
        }
    }

    /// Whether the sweep task has already exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_get_honors_ttl_without_sweep() {
        let cache = CountCache::new();
        cache.set(PRODUCT_COUNT_KEY, 25, COUNT_TTL);

        tokio::time::advance(COUNT_TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.get(PRODUCT_COUNT_KEY), Some(25));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(PRODUCT_COUNT_KEY), None);
        // Still physically present until swept
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_and_resets_clock() {
        let cache = CountCache::new();
        cache.set(CATEGORY_COUNT_KEY, 1, COUNT_TTL);
        tokio::time::advance(Duration::from_secs(120)).await;

        cache.set(CATEGORY_COUNT_KEY, 2, COUNT_TTL);
        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(cache.get(CATEGORY_COUNT_KEY), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let cache = CountCache::new();
        cache.set("short", 1, Duration::from_secs(10));
        cache.set("long", 2, COUNT_TTL);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_compute_caches_result() {
        let cache = CountCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let count = cache
                .get_or_compute(PRODUCT_COUNT_KEY, COUNT_TTL, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(7)
                })
                .await
                .unwrap();
            assert_eq!(count, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(COUNT_TTL).await;
        cache
            .get_or_compute(PRODUCT_COUNT_KEY, COUNT_TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(8)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get(PRODUCT_COUNT_KEY), Some(8));
    }

    #[tokio::test]
    async fn test_failed_compute_leaves_cache_empty() {
        let cache = CountCache::new();
        let result = cache
            .get_or_compute(PRODUCT_COUNT_KEY, COUNT_TTL, || async { Err::<i64, _>("down") })
            .await;
        assert_eq!(result, Err("down"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper_reclaims_entries() {
        let cache = CountCache::new();
        cache.set("stale", 3, Duration::from_secs(5));

        let sweeper = cache.spawn_sweeper(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(31)).await;
        // Let the sweep task observe the tick
        tokio::task::yield_now().await;
        assert!(cache.is_empty());

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_sweeper_keeps_running() {
        let cache = CountCache::new();
        cache.set("stale", 1, Duration::from_millis(2));

        let sweeper = cache.spawn_sweeper(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert!(!sweeper.is_finished());
        assert!(cache.is_empty());
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_shutdown_stops_task() {
        let cache = CountCache::new();
        let sweeper = cache.spawn_sweeper(Duration::from_secs(3600));
        assert!(!sweeper.is_finished());
        sweeper.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_is_safe() {
        let cache = CountCache::new();
        let mut tasks = Vec::new();

        for i in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for j in 0..200 {
                    cache.set(PRODUCT_COUNT_KEY, i * 1000 + j, COUNT_TTL);
                    let _ = cache.get(PRODUCT_COUNT_KEY);
                    let _ = cache.sweep();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(cache.get(PRODUCT_COUNT_KEY).is_some());
    }
}
