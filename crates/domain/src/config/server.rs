use serde::{Deserialize, Serialize};

/// Listener configuration for the query dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Plain DNS bind points (each serves UDP and TCP).
    #[serde(default = "default_bind")]
    pub bind: Vec<String>,

    /// DNS-over-TLS bind points. Requires `tls_cert_file` / `tls_key_file`.
    #[serde(default)]
    pub bind_tls: Vec<String>,

    /// DNS-over-HTTPS bind points (`/dns-query`). Requires the TLS key pair.
    #[serde(default)]
    pub bind_https: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key_file: Option<String>,

    /// Per-query wall clock, outer bound over all stages.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// TCP/DoT/DoH connection idle timeout. Never cancels an in-flight query.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Bounded drain time for graceful close.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            bind_tls: vec![],
            bind_https: vec![],
            tls_cert_file: None,
            tls_key_file: None,
            query_timeout_ms: default_query_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_bind() -> Vec<String> {
    vec!["0.0.0.0:53".to_string()]
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

fn default_idle_timeout_secs() -> u64 {
    30
}

fn default_drain_timeout_secs() -> u64 {
    5
}
