use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// What a blocked A/AAAA query answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BlockMode {
    /// `0.0.0.0` / `::` with NOERROR; non-address types answer NXDOMAIN.
    #[default]
    ZeroIp,
    /// NXDOMAIN for every query type.
    NxDomain,
    /// The configured sinkhole address for the matching family; NXDOMAIN
    /// when no sinkhole of that family is configured.
    Sinkhole,
}

/// Blocklist engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockingConfig {
    /// `group name → list sources` (file paths or http(s) URLs).
    #[serde(default)]
    pub deny_groups: HashMap<String, Vec<String>>,

    /// Allowlist groups; a match here always wins over a deny match.
    #[serde(default)]
    pub allow_groups: HashMap<String, Vec<String>>,

    /// `client id → group names`. Client ids are IPs, client names, or CIDR
    /// prefixes; the `default` key applies to unmatched clients.
    #[serde(default)]
    pub client_groups: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub block_mode: BlockMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sinkhole_ipv4: Option<Ipv4Addr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sinkhole_ipv6: Option<Ipv6Addr>,

    /// TTL stamped on synthesized block answers.
    #[serde(default = "default_block_ttl_secs")]
    pub block_ttl_secs: u32,

    /// Scheduled list refresh period. 0 disables the ticker.
    #[serde(default = "default_refresh_period_secs")]
    pub refresh_period_secs: u64,

    /// Resumable parse errors tolerated per source before giving up on it.
    #[serde(default = "default_max_errors_per_source")]
    pub max_errors_per_source: usize,

    /// Re-apply block rules over each CNAME target in upstream answers.
    #[serde(default = "default_true")]
    pub inspect_cname: bool,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            deny_groups: HashMap::new(),
            allow_groups: HashMap::new(),
            client_groups: HashMap::new(),
            block_mode: BlockMode::default(),
            sinkhole_ipv4: None,
            sinkhole_ipv6: None,
            block_ttl_secs: default_block_ttl_secs(),
            refresh_period_secs: default_refresh_period_secs(),
            max_errors_per_source: default_max_errors_per_source(),
            inspect_cname: default_true(),
        }
    }
}

fn default_block_ttl_secs() -> u32 {
    21_600
}

fn default_refresh_period_secs() -> u64 {
    14_400
}

fn default_max_errors_per_source() -> usize {
    5
}

fn default_true() -> bool {
    true
}
