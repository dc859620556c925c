use super::key::CacheKey;
use dashmap::{DashMap, DashSet};
use futures::future::BoxFuture;
use hickory_proto::op::Message;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A cached answer plus whether the latest store was a proactive reload.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub message: Message,
    pub prefetch: bool,
}

/// Reload callback: re-resolve one key, returning the fresh message and its
/// TTL, or `None` to let the entry lapse.
pub type ReloadFn =
    Arc<dyn Fn(CacheKey) -> BoxFuture<'static, Option<(Message, Duration)>> + Send + Sync>;

struct CacheEntry {
    value: CachedResponse,
    expires_at: Instant,
    /// Milliseconds since cache creation; recency for LRU eviction.
    last_access: AtomicU64,
}

struct UsageCounter {
    count: AtomicU64,
    window_ends: Instant,
}

/// Size-capped expiring cache with reload-on-expiry for hot keys.
///
/// `get`/`put` and the periodic cleanup may run in parallel; mutations
/// serialize per key on the map shards. A sibling counter cache tracks
/// per-key usage within a rolling hot window; when an entry expires and its
/// counter exceeds the prefetch threshold, the reload callback runs
/// (singleflight per key) and the fresh value is stored with
/// `prefetch = true`.
pub struct ExpiringCache {
    entries: DashMap<CacheKey, CacheEntry, FxBuildHasher>,
    usage: DashMap<CacheKey, UsageCounter, FxBuildHasher>,
    reloading: DashSet<CacheKey, FxBuildHasher>,
    /// 0 = unbounded.
    max_items: usize,
    hot_window: Duration,
    prefetch_threshold: u64,
    reloader: Option<ReloadFn>,
    created_at: Instant,
}

impl ExpiringCache {
    pub fn new(max_items: usize, hot_window: Duration, prefetch_threshold: u64) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            usage: DashMap::with_hasher(FxBuildHasher),
            reloading: DashSet::with_hasher(FxBuildHasher),
            max_items,
            hot_window,
            prefetch_threshold,
            reloader: None,
            created_at: Instant::now(),
        })
    }

    pub fn with_reloader(
        max_items: usize,
        hot_window: Duration,
        prefetch_threshold: u64,
        reloader: ReloadFn,
    ) -> Arc<Self> {
        let mut cache = Self::new(max_items, hot_window, prefetch_threshold);
        Arc::get_mut(&mut cache)
            .expect("freshly created cache is uniquely owned")
            .reloader = Some(reloader);
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ticks(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    /// Value and remaining TTL. Expired entries are never returned; finding
    /// one removes it and, when the key is hot, kicks off the reload.
    pub fn get(self: &Arc<Self>, key: &CacheKey) -> Option<(CachedResponse, Duration)> {
        self.record_usage(key);

        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > now {
                    entry.last_access.store(self.ticks(), Ordering::Relaxed);
                    let remaining = entry.expires_at - now;
                    return Some((entry.value.clone(), remaining));
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
            self.maybe_reload(key.clone());
        }
        None
    }

    pub fn put(self: &Arc<Self>, key: CacheKey, message: Message, ttl: Duration) {
        self.insert(key, message, ttl, false);
    }

    fn insert(self: &Arc<Self>, key: CacheKey, message: Message, ttl: Duration, prefetch: bool) {
        if ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                value: CachedResponse { message, prefetch },
                expires_at: Instant::now() + ttl,
                last_access: AtomicU64::new(self.ticks()),
            },
        );
        self.enforce_capacity();
    }

    /// Remove expired entries, reloading the hot ones. Invoked from the
    /// periodic maintenance job. Returns the number of removed entries.
    pub fn run_cleanup(self: &Arc<Self>) -> usize {
        let now = Instant::now();

        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| entry.value().expires_at <= now)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            if self
                .entries
                .remove_if(&key, |_, entry| entry.expires_at <= now)
                .is_some()
            {
                removed += 1;
                self.maybe_reload(key);
            }
        }

        // Drop usage counters whose window ended.
        self.usage.retain(|_, counter| counter.window_ends > now);

        removed
    }

    fn record_usage(&self, key: &CacheKey) {
        let now = Instant::now();
        let mut counter = self.usage.entry(key.clone()).or_insert_with(|| UsageCounter {
            count: AtomicU64::new(0),
            window_ends: now + self.hot_window,
        });
        if counter.window_ends <= now {
            *counter = UsageCounter {
                count: AtomicU64::new(0),
                window_ends: now + self.hot_window,
            };
        }
        counter.count.fetch_add(1, Ordering::Relaxed);
    }

    fn usage_count(&self, key: &CacheKey) -> u64 {
        self.usage
            .get(key)
            .filter(|counter| counter.window_ends > Instant::now())
            .map(|counter| counter.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Reload at most once concurrently per key, and only for hot keys.
    fn maybe_reload(self: &Arc<Self>, key: CacheKey) {
        let Some(reloader) = self.reloader.clone() else {
            return;
        };
        if self.usage_count(&key) <= self.prefetch_threshold {
            return;
        }
        if !self.reloading.insert(key.clone()) {
            return;
        }

        let cache = Arc::clone(self);
        tokio::spawn(async move {
            debug!(qname = %key.qname, qtype = %key.qtype, "Prefetching expired entry");
            if let Some((message, ttl)) = reloader(key.clone()).await {
                cache.insert(key.clone(), message, ttl, true);
            }
            cache.reloading.remove(&key);
        });
    }

    /// Evict least-recently-used entries when over capacity.
    fn enforce_capacity(&self) {
        if self.max_items == 0 || self.entries.len() <= self.max_items {
            return;
        }

        let excess = self.entries.len() - self.max_items;
        let mut candidates: Vec<(CacheKey, u64)> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().last_access.load(Ordering::Relaxed),
                )
            })
            .collect();
        candidates.sort_by_key(|(_, last_access)| *last_access);

        let mut evicted = 0;
        for (key, _) in candidates.into_iter().take(excess) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, "Cache over capacity, evicted LRU entries");
        }
    }
}
