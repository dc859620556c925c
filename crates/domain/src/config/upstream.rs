use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the group queries fall into when no conditional rule matched.
pub const DEFAULT_UPSTREAM_GROUP: &str = "default";

/// Upstream resolver groups.
///
/// Endpoint strings:
/// - `udp:9.9.9.9:53` (or a bare `ip[:port]`): plain DNS, TCP fallback on
///   truncation
/// - `tcp-tls:dns.quad9.net:853`: DNS over TLS
/// - `https://dns.quad9.net/dns-query`: DNS over HTTPS
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamsConfig {
    /// `group name → endpoints`. The `default` group must be present.
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,

    /// Hard per-query timeout against a single upstream.
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per query; retries prefer a different resolver.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            timeout_ms: default_upstream_timeout_ms(),
            attempts: default_attempts(),
        }
    }
}

fn default_upstream_timeout_ms() -> u64 {
    2000
}

fn default_attempts() -> u32 {
    3
}
