use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Symbolic client-name resolution used for per-group decisions.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientLookupConfig {
    /// DNS server used for reverse (PTR) lookups of client IPs, e.g.
    /// `"192.168.1.1:53"`. Reverse lookup is skipped when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    /// Static `name → addresses` map consulted before reverse lookup.
    #[serde(default)]
    pub clients: HashMap<String, Vec<IpAddr>>,
}
