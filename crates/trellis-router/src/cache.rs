//! Lookup result cache for hot parameterized routes.
//!
//! Entries are keyed by `(method, literal request path)` and hold the
//! resolved handler plus the already-extracted parameter values, so a hit
//! skips the trie walk entirely. Promotion is driven by per-node hit
//! counters: only paths that resolve through a wildcard node hit more than
//! the promotion threshold are stored.
//!
//! Eviction is a full wipe. A periodic sweep clears every entry and resets
//! every hit counter; there is no per-entry TTL or LRU bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SweeperError;
use crate::params::Params;
use trellis_telemetry::log_cache_swept;

/// Shared hit counter of one wildcard node.
///
/// Incremented with relaxed ordering from concurrent lookups. Lost updates
/// only delay promotion; the value is never used for routing decisions.
#[derive(Debug, Clone, Default)]
pub(crate) struct HitCounter(Arc<AtomicU32>);

impl HitCounter {
    /// Record one hit and return the new count.
    pub(crate) fn bump(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    #[cfg(test)]
    pub(crate) fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Every hit counter created for a router's trees, so a sweep can reset
/// them without walking the trees.
#[derive(Debug, Default)]
pub(crate) struct HitCounters {
    counters: Mutex<Vec<HitCounter>>,
}

impl HitCounters {
    /// Create a new counter and start tracking it.
    pub(crate) fn track(&self) -> HitCounter {
        let counter = HitCounter::default();
        self.counters.lock().push(counter.clone());
        counter
    }

    fn reset_all(&self) {
        for counter in self.counters.lock().iter() {
            counter.reset();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.counters.lock().len()
    }
}

/// A cached lookup result.
#[derive(Debug)]
pub struct CacheEntry<H> {
    /// The resolved handler.
    pub handler: Option<Arc<H>>,
    /// Whether the lookup recommended a trailing-slash redirect.
    pub trailing_slash_redirect: bool,
    /// Parameter values extracted from the exact path the entry is stored under.
    pub params: Params,
}

impl<H> Clone for CacheEntry<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            trailing_slash_redirect: self.trailing_slash_redirect,
            params: self.params.clone(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached `(method, path)` entries.
    pub entries: usize,
    /// Number of hit counters being tracked.
    pub tracked_counters: usize,
    /// Number of full wipes performed so far.
    pub sweeps: u64,
}

/// Thread-safe `(method, path)` result cache.
///
/// A single mutex guards both `get` and `put`. Callers never hold it across
/// a trie walk.
#[derive(Debug)]
pub struct ResultCache<H> {
    /// method -> literal request path -> entry
    entries: Mutex<HashMap<String, HashMap<String, CacheEntry<H>>>>,
    counters: HitCounters,
    sweeps: AtomicU64,
}

impl<H> Default for ResultCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ResultCache<H> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            counters: HitCounters::default(),
            sweeps: AtomicU64::new(0),
        }
    }

    /// Get the entry stored for this exact method and path.
    pub fn get(&self, method: &str, path: &str) -> Option<CacheEntry<H>> {
        let entries = self.entries.lock();
        entries.get(method)?.get(path).cloned()
    }

    /// Store a resolved lookup.
    pub fn put(
        &self,
        method: &str,
        path: &str,
        handler: Option<Arc<H>>,
        trailing_slash_redirect: bool,
        params: Params,
    ) {
        let entry = CacheEntry {
            handler,
            trailing_slash_redirect,
            params,
        };

        let mut entries = self.entries.lock();
        entries
            .entry(method.to_string())
            .or_default()
            .insert(path.to_string(), entry);
    }

    /// Clear every entry and reset every hit counter.
    ///
    /// Returns the number of entries that were dropped.
    pub fn wipe(&self) -> usize {
        let cleared = {
            let mut entries = self.entries.lock();
            let cleared = entries.values().map(HashMap::len).sum();
            entries.clear();
            cleared
        };
        self.counters.reset_all();
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        cleared
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().values().map(HashMap::len).sum();
        CacheStats {
            entries,
            tracked_counters: self.counters.len(),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn counters(&self) -> &HitCounters {
        &self.counters
    }
}

/// Handle to the background task that periodically wipes a [`ResultCache`].
///
/// The task stops when [`CacheSweeper::stop`] is called or the handle is
/// dropped.
#[derive(Debug)]
pub struct CacheSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Spawn the sweep loop on the current Tokio runtime.
    pub fn spawn<H>(cache: Arc<ResultCache<H>>, period: Duration) -> Result<Self, SweeperError>
    where
        H: Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = runtime.spawn(async move {
            sweep_loop(cache, period, shutdown_rx).await;
        });

        Ok(Self {
            shutdown_tx,
            handle,
        })
    }

    /// Signal the sweep loop to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether the sweep loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop<H>(
    cache: Arc<ResultCache<H>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::debug!("cache sweeper stopped");
                    return;
                }
            }
            _ = interval.tick() => {
                let cleared = cache.wipe();
                log_cache_swept!(entries_cleared = cleared, "result cache wiped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        let mut params = Params::new();
        for (name, value) in pairs {
            params.push(*name, *value);
        }
        params
    }

    #[test]
    fn test_cache_miss() {
        let cache: ResultCache<u32> = ResultCache::new();
        assert!(cache.get("GET", "/users/1").is_none());
    }

    #[test]
    fn test_cache_hit() {
        let cache = ResultCache::new();
        cache.put(
            "GET",
            "/users/1",
            Some(Arc::new(7u32)),
            false,
            params(&[("id", "1")]),
        );

        let entry = cache.get("GET", "/users/1").expect("entry");
        assert_eq!(entry.handler.as_deref(), Some(&7));
        assert!(!entry.trailing_slash_redirect);
        assert_eq!(entry.params.get("id"), Some("1"));
    }

    #[test]
    fn test_cache_is_keyed_by_method_and_literal_path() {
        let cache = ResultCache::new();
        cache.put("GET", "/users/1", Some(Arc::new(1u32)), false, Params::new());

        assert!(cache.get("POST", "/users/1").is_none());
        assert!(cache.get("GET", "/users/2").is_none());
        assert!(cache.get("GET", "/users/1/").is_none());
    }

    #[test]
    fn test_wipe_clears_entries_and_counters() {
        let cache = ResultCache::new();
        let counter = cache.counters().track();
        counter.bump();
        counter.bump();

        cache.put("GET", "/a/1", Some(Arc::new(1u32)), false, Params::new());
        cache.put("PUT", "/a/1", Some(Arc::new(2u32)), false, Params::new());

        assert_eq!(cache.wipe(), 2);
        assert_eq!(counter.get(), 0);
        assert!(cache.get("GET", "/a/1").is_none());

        let stats = cache.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.tracked_counters, 1);
        assert_eq!(stats.sweeps, 1);
    }

    #[test]
    fn test_hit_counter_bump_returns_new_value() {
        let counter = HitCounter::default();
        assert_eq!(counter.bump(), 1);
        assert_eq!(counter.bump(), 2);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_sweeper_requires_runtime() {
        let cache: Arc<ResultCache<u32>> = Arc::new(ResultCache::new());
        let result = CacheSweeper::spawn(cache, Duration::from_millis(10));
        assert!(matches!(result, Err(SweeperError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_sweeper_wipes_periodically() {
        let cache = Arc::new(ResultCache::new());
        cache.put("GET", "/a/1", Some(Arc::new(1u32)), false, Params::new());

        let sweeper = CacheSweeper::spawn(Arc::clone(&cache), Duration::from_millis(20))
            .expect("runtime available");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("GET", "/a/1").is_none());
        assert!(cache.stats().sweeps >= 1);
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_signalled() {
        let cache: Arc<ResultCache<u32>> = Arc::new(ResultCache::new());
        let sweeper = CacheSweeper::spawn(Arc::clone(&cache), Duration::from_millis(10))
            .expect("runtime available");
        sweeper.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sweeper.is_finished());

        let sweeps = cache.stats().sweeps;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.stats().sweeps, sweeps);
    }
}
