use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Static per-domain overrides. A mapping covers the domain and all of its
/// subdomains.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomDnsConfig {
    /// `domain → addresses` answered for A/AAAA queries.
    #[serde(default)]
    pub mapping: HashMap<String, Vec<IpAddr>>,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u32,

    /// Answer empty NOERROR for mapped domains when the query type has no
    /// configured address, instead of forwarding upstream.
    #[serde(default = "default_true")]
    pub filter_unmapped_types: bool,
}

impl Default for CustomDnsConfig {
    fn default() -> Self {
        Self {
            mapping: HashMap::new(),
            ttl_secs: default_ttl_secs(),
            filter_unmapped_types: default_true(),
        }
    }
}

fn default_ttl_secs() -> u32 {
    3600
}

fn default_true() -> bool {
    true
}
