use anyhow::Context;
use std::path::PathBuf;
use warden_dns_domain::config::CONFIG_ENV_VAR;
use warden_dns_domain::Config;

const DEFAULT_CONFIG_PATH: &str = "/etc/warden-dns/config.toml";

/// Resolve the configuration path: `--config` flag, then the environment
/// variable, then the system default.
pub fn config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load(flag: Option<PathBuf>) -> anyhow::Result<Config> {
    let path = config_path(flag);
    Config::load(&path).with_context(|| format!("loading configuration from {}", path.display()))
}
