use serde::{Deserialize, Serialize};

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on cached entries; LRU eviction beyond it.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Cached TTL is clamped into `[min_ttl_secs, max_ttl_secs]`.
    #[serde(default)]
    pub min_ttl_secs: u32,

    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u32,

    /// TTL for cached NXDOMAIN responses.
    #[serde(default = "default_negative_ttl_secs")]
    pub negative_ttl_secs: u32,

    #[serde(default = "default_true")]
    pub prefetching: bool,

    /// Rolling window over which per-key usage counters live.
    #[serde(default = "default_prefetch_window_secs")]
    pub prefetch_window_secs: u64,

    /// A key is reloaded at expiry iff its counter exceeds this.
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: u64,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_items: default_max_items(),
            min_ttl_secs: 0,
            max_ttl_secs: default_max_ttl_secs(),
            negative_ttl_secs: default_negative_ttl_secs(),
            prefetching: true,
            prefetch_window_secs: default_prefetch_window_secs(),
            prefetch_threshold: default_prefetch_threshold(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_items() -> usize {
    100_000
}

fn default_max_ttl_secs() -> u32 {
    21_600
}

fn default_negative_ttl_secs() -> u32 {
    1800
}

fn default_prefetch_window_secs() -> u64 {
    7200
}

fn default_prefetch_threshold() -> u64 {
    5
}

fn default_cleanup_interval_secs() -> u64 {
    60
}
