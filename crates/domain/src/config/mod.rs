pub mod blocking;
pub mod broker;
pub mod caching;
pub mod client_lookup;
pub mod conditional;
pub mod custom_dns;
pub mod filtering;
pub mod hosts_file;
pub mod logging;
pub mod server;
pub mod upstream;

pub use blocking::{BlockMode, BlockingConfig};
pub use broker::BrokerConfig;
pub use caching::CachingConfig;
pub use client_lookup::ClientLookupConfig;
pub use conditional::{ConditionalConfig, ConditionalForward};
pub use custom_dns::CustomDnsConfig;
pub use filtering::FilteringConfig;
pub use hosts_file::HostsFileConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;
pub use upstream::{UpstreamsConfig, DEFAULT_UPSTREAM_GROUP};

use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the configuration-file path.
pub const CONFIG_ENV_VAR: &str = "WARDEN_DNS_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstreams: UpstreamsConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub caching: CachingConfig,

    #[serde(default)]
    pub conditional: ConditionalConfig,

    #[serde(default)]
    pub custom_dns: CustomDnsConfig,

    #[serde(default)]
    pub hosts_file: HostsFileConfig,

    #[serde(default)]
    pub filtering: FilteringConfig,

    #[serde(default)]
    pub client_lookup: ClientLookupConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<BrokerConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, DomainError> {
        let config: Config =
            toml::from_str(text).map_err(|e| DomainError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup-time validation; configuration errors are fatal here and
    /// never at runtime.
    pub fn validate(&self) -> Result<(), DomainError> {
        let default_group = self.upstreams.groups.get(DEFAULT_UPSTREAM_GROUP);
        if default_group.map_or(true, |servers| servers.is_empty()) {
            return Err(DomainError::InvalidConfig(format!(
                "upstream group '{DEFAULT_UPSTREAM_GROUP}' must be configured with at least one endpoint"
            )));
        }

        for rule in &self.conditional.rules {
            if !self.upstreams.groups.contains_key(&rule.group) {
                return Err(DomainError::InvalidConfig(format!(
                    "conditional rule for '{}' references unknown upstream group '{}'",
                    rule.domain, rule.group
                )));
            }
        }

        for (client, groups) in &self.blocking.client_groups {
            for group in groups {
                if !self.blocking.deny_groups.contains_key(group)
                    && !self.blocking.allow_groups.contains_key(group)
                {
                    return Err(DomainError::InvalidConfig(format!(
                        "client '{client}' references unknown blocking group '{group}'"
                    )));
                }
            }
        }

        if (!self.server.bind_tls.is_empty() || !self.server.bind_https.is_empty())
            && (self.server.tls_cert_file.is_none() || self.server.tls_key_file.is_none())
        {
            return Err(DomainError::InvalidConfig(
                "TLS/HTTPS listeners require tls_cert_file and tls_key_file".into(),
            ));
        }

        if self.blocking.block_mode == BlockMode::Sinkhole
            && self.blocking.sinkhole_ipv4.is_none()
            && self.blocking.sinkhole_ipv6.is_none()
        {
            return Err(DomainError::InvalidConfig(
                "block_mode = \"sinkhole\" requires a sinkhole address".into(),
            ));
        }

        if self.caching.min_ttl_secs > self.caching.max_ttl_secs {
            return Err(DomainError::InvalidConfig(format!(
                "caching.min_ttl_secs ({}) exceeds max_ttl_secs ({})",
                self.caching.min_ttl_secs, self.caching.max_ttl_secs
            )));
        }

        Ok(())
    }

    /// Serialized form printed on the config-dump signal.
    pub fn dump(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|e| format!("<unserializable config: {e}>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_toml(
            r#"
            [upstreams.groups]
            default = ["udp:9.9.9.9:53"]
            "#,
        )
        .unwrap();
        assert_eq!(config.upstreams.timeout_ms, 2000);
        assert_eq!(config.server.bind, vec!["0.0.0.0:53"]);
        assert!(config.broker.is_none());
    }

    #[test]
    fn test_missing_default_group_rejected() {
        let err = Config::from_toml("").unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig(_)));
    }

    #[test]
    fn test_conditional_rule_must_reference_known_group() {
        let err = Config::from_toml(
            r#"
            [upstreams.groups]
            default = ["udp:9.9.9.9:53"]

            [[conditional.rules]]
            domain = "home.lan"
            group = "lan"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig(_)));
    }

    #[test]
    fn test_client_group_must_exist() {
        let err = Config::from_toml(
            r#"
            [upstreams.groups]
            default = ["udp:9.9.9.9:53"]

            [blocking.client_groups]
            default = ["ads"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig(_)));
    }

    #[test]
    fn test_sinkhole_requires_address() {
        let err = Config::from_toml(
            r#"
            [upstreams.groups]
            default = ["udp:9.9.9.9:53"]

            [blocking]
            block_mode = "sinkhole"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig(_)));
    }

    #[test]
    fn test_dump_round_trips() {
        let config = Config::from_toml(
            r#"
            [upstreams.groups]
            default = ["udp:9.9.9.9:53"]

            [blocking.deny_groups]
            ads = ["/var/lib/warden/ads.txt"]

            [blocking.client_groups]
            default = ["ads"]
            "#,
        )
        .unwrap();
        let reparsed = Config::from_toml(&config.dump()).unwrap();
        assert_eq!(
            reparsed.blocking.deny_groups["ads"],
            vec!["/var/lib/warden/ads.txt"]
        );
    }
}
