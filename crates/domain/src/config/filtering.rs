use serde::{Deserialize, Serialize};

/// Query-type filtering and FQDN enforcement.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilteringConfig {
    /// Query types answered with an empty NOERROR (e.g. `["AAAA"]`).
    #[serde(default)]
    pub query_types: Vec<String>,

    /// Refuse single-label (non-dotted) query names.
    #[serde(default)]
    pub fqdn_only: bool,
}
