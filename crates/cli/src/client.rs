use anyhow::Context;
use hickory_proto::rr::RecordType;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use warden_dns_application::ports::{BlockingToggle, SharedStateBroker};
use warden_dns_domain::Config;
use warden_dns_infrastructure::broker::RedisBroker;
use warden_dns_infrastructure::dns::upstream::UpstreamGroup;

const CLI_TIMEOUT: Duration = Duration::from_secs(5);

/// Name whose resolution (any DNS-level answer) proves the instance is up.
const HEALTHCHECK_NAME: &str = "healthcheck.warden-dns";

fn client_group(server: &str) -> anyhow::Result<UpstreamGroup> {
    UpstreamGroup::new("cli", &[format!("udp:{server}")], CLI_TIMEOUT, 1)
        .with_context(|| format!("invalid server address '{server}'"))
}

/// `query <name> [--type T]`: resolve through the running instance and
/// print the answer records.
pub async fn query(server: &str, name: &str, qtype: RecordType) -> anyhow::Result<()> {
    let group = client_group(server)?;
    let response = group
        .resolve(name, qtype)
        .await
        .with_context(|| format!("query against {server} failed"))?;

    println!("; rcode: {}", response.response_code());
    for record in response.answers() {
        println!("{record}");
    }
    Ok(())
}

/// `healthcheck`: any DNS-level response counts as healthy.
pub async fn healthcheck(server: &str) -> anyhow::Result<()> {
    let group = client_group(server)?;
    group
        .resolve(HEALTHCHECK_NAME, RecordType::A)
        .await
        .with_context(|| format!("no answer from {server}"))?;
    println!("healthy");
    Ok(())
}

/// Publish a blocking toggle on the shared store's enable channel. Peers
/// (including the local instance) apply it on receipt.
pub async fn publish_blocking_toggle(config: &Config, toggle: BlockingToggle) -> anyhow::Result<()> {
    let Some(broker_config) = &config.broker else {
        anyhow::bail!("no shared store configured; runtime blocking control needs [broker]");
    };

    let cancel = CancellationToken::new();
    let (inbound_tx, _inbound_rx) = mpsc::channel(8);
    let broker = RedisBroker::connect(broker_config, inbound_tx, cancel.clone())
        .await
        .context("connecting to shared store")?;

    broker.publish_blocking_toggle(&toggle);
    // The publish queue drains asynchronously; give it a moment.
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();

    let scope = if toggle.groups.is_empty() {
        "all groups".to_string()
    } else {
        toggle
            .groups
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!(
        "blocking {} for {scope}",
        if toggle.enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
