#[path = "../common/mod.rs"]
mod common;

use common::MockUpstream;
use hickory_proto::rr::RecordType;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use warden_dns_application::blocking_controller::BlockingController;
use warden_dns_application::ports::{ChainResolver, GroupedRuleIndex};
use warden_dns_domain::{Config, DnsRequest, ResponseType, TransportProtocol};
use warden_dns_infrastructure::dns::client_lookup::NoClientLookup;
use warden_dns_infrastructure::dns::message;
use warden_dns_infrastructure::dns::resolver::{QueryLogResolver, ResolverBuilder, ResolverChain};
use warden_dns_infrastructure::dns::upstream::UpstreamGroups;
use warden_dns_infrastructure::lists::index::{
    ChainedGroupedIndex, DomainGroupedIndex, IpGroupedIndex,
};
use warden_dns_infrastructure::lists::ListRefresher;
use warden_dns_infrastructure::logging::TracingQueryLogWriter;

fn chained_index() -> Arc<dyn GroupedRuleIndex> {
    Arc::new(ChainedGroupedIndex::new(vec![
        Arc::new(DomainGroupedIndex::new()),
        Arc::new(IpGroupedIndex::new()),
    ]))
}

struct Harness {
    chain: ResolverChain,
    controller: Arc<BlockingController>,
    _deny_file: tempfile::NamedTempFile,
}

async fn build(config_toml: String, deny_rules: &str) -> Harness {
    let mut deny_file = tempfile::NamedTempFile::new().unwrap();
    deny_file.write_all(deny_rules.as_bytes()).unwrap();

    let config_toml = config_toml.replace("__DENY_LIST__", &deny_file.path().display().to_string());
    let config = Config::from_toml(&config_toml).unwrap();

    let deny_index = chained_index();
    let allow_index = chained_index();
    ListRefresher::new(&config.blocking, Arc::clone(&deny_index), Arc::clone(&allow_index))
        .unwrap()
        .refresh_all(&CancellationToken::new())
        .await
        .unwrap();

    let controller = BlockingController::new(None);
    let (log_tx, _log_task) = QueryLogResolver::spawn_writer(
        Arc::new(TracingQueryLogWriter),
        CancellationToken::new(),
    );

    let upstream_groups = Arc::new(UpstreamGroups::new(&config.upstreams).unwrap());
    let chain = ResolverBuilder::new(
        config,
        upstream_groups,
        deny_index,
        allow_index,
        Arc::clone(&controller),
        Arc::new(NoClientLookup),
        log_tx,
        None,
    )
    .build()
    .await
    .unwrap();

    Harness {
        chain,
        controller,
        _deny_file: deny_file,
    }
}

fn request_for(name: &str, qtype: RecordType) -> DnsRequest {
    DnsRequest::new(
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)),
        TransportProtocol::Udp,
        message::build_query(name, qtype).unwrap(),
    )
}

fn config_for(upstream: std::net::SocketAddr, extra: &str) -> String {
    format!(
        r#"
        [upstreams.groups]
        default = ["udp:{upstream}"]

        [blocking.deny_groups]
        ads = ["__DENY_LIST__"]

        [blocking.client_groups]
        default = ["ads"]

        {extra}
        "#
    )
}

#[tokio::test]
async fn test_prefetch_reload_flow() {
    let (upstream, addr) = MockUpstream::start(Ipv4Addr::new(203, 0, 113, 1), 1).await;
    let config = config_for(
        addr,
        r#"
        [caching]
        prefetch_threshold = 5
        "#,
    );
    let harness = build(config, "doubleclick.net\n").await;

    // 20 queries within the hot window; only the first reaches upstream.
    for _ in 0..20 {
        harness
            .chain
            .entry
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
    }
    assert_eq!(upstream.query_count(), 1);

    // Let the 1s TTL lapse, then run the maintenance sweep that triggers
    // the background reload.
    tokio::time::sleep(Duration::from_millis(1300)).await;
    harness.chain.caching.cache().run_cleanup();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(upstream.query_count(), 2, "expected exactly one reload");

    let response = harness
        .chain
        .entry
        .resolve(&request_for("example.com", RecordType::A))
        .await
        .unwrap();
    assert_eq!(response.rtype, ResponseType::Cached);
    assert!(
        response.reason.contains("prefetched"),
        "reason was {}",
        response.reason
    );
}

#[tokio::test]
async fn test_blocking_toggle_flow() {
    let (_upstream, addr) = MockUpstream::start(Ipv4Addr::new(203, 0, 113, 1), 300).await;
    let harness = build(config_for(addr, ""), "doubleclick.net\n").await;

    let blocked = harness
        .chain
        .entry
        .resolve(&request_for("doubleclick.net", RecordType::A))
        .await
        .unwrap();
    assert_eq!(blocked.rtype, ResponseType::Blocked);

    harness.controller.disable(None, vec![]);
    let passed = harness
        .chain
        .entry
        .resolve(&request_for("doubleclick.net", RecordType::A))
        .await
        .unwrap();
    assert_ne!(passed.rtype, ResponseType::Blocked);

    harness.controller.enable(vec![]);
    let blocked_again = harness
        .chain
        .entry
        .resolve(&request_for("doubleclick.net", RecordType::A))
        .await
        .unwrap();
    assert_eq!(blocked_again.rtype, ResponseType::Blocked);
}

#[tokio::test]
async fn test_special_and_filtered_types_never_reach_upstream() {
    let (upstream, addr) = MockUpstream::start(Ipv4Addr::new(203, 0, 113, 1), 300).await;
    let config = config_for(
        addr,
        r#"
        [filtering]
        query_types = ["AAAA"]
        "#,
    );
    let harness = build(config, "doubleclick.net\n").await;

    let special = harness
        .chain
        .entry
        .resolve(&request_for("localhost", RecordType::A))
        .await
        .unwrap();
    assert_eq!(special.rtype, ResponseType::Special);

    let filtered = harness
        .chain
        .entry
        .resolve(&request_for("example.com", RecordType::AAAA))
        .await
        .unwrap();
    assert_eq!(filtered.rtype, ResponseType::Filtered);
    assert!(filtered.message.answers().is_empty());

    assert_eq!(upstream.query_count(), 0);
}
