use serde::{Deserialize, Serialize};

/// Shared-state broker (external key/value + pub/sub store).
///
/// Optional: when absent, cache and blocking-toggle events stay
/// process-local.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// Store address, e.g. `redis://127.0.0.1:6379/0`.
    pub address: String,

    /// Connection attempts before the broker reports unhealthy.
    #[serde(default = "default_connection_attempts")]
    pub connection_attempts: u32,

    /// Base cooldown between attempts; doubles per retry.
    #[serde(default = "default_connection_cooldown_ms")]
    pub connection_cooldown_ms: u64,

    /// TTL applied to stored cache entries whose minimum answer TTL is zero.
    #[serde(default = "default_entry_ttl_secs")]
    pub default_entry_ttl_secs: u64,
}

fn default_connection_attempts() -> u32 {
    3
}

fn default_connection_cooldown_ms() -> u64 {
    1000
}

fn default_entry_ttl_secs() -> u64 {
    300
}
