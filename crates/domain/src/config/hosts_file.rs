use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pre-loaded hosts file served before upstream resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostsFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Skip loopback/self-referential entries (`localhost`, `::1`, …).
    #[serde(default = "default_true")]
    pub filter_loopback: bool,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u32,
}

impl Default for HostsFileConfig {
    fn default() -> Self {
        Self {
            path: None,
            filter_loopback: default_true(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u32 {
    3600
}
