use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_dns_application::blocking_controller::BlockingController;
use warden_dns_application::ports::{
    BrokerEvent, ClientNameLookup, GroupedRuleIndex, SharedStateBroker,
};
use warden_dns_application::RuntimeStats;
use warden_dns_domain::Config;
use warden_dns_infrastructure::broker::RedisBroker;
use warden_dns_infrastructure::dns::client_lookup::{NoClientLookup, StaticPtrLookup};
use warden_dns_infrastructure::dns::message;
use warden_dns_infrastructure::dns::resolver::{QueryLogResolver, ResolverBuilder};
use warden_dns_infrastructure::dns::server::{ChainRequestHandler, DnsServer};
use warden_dns_infrastructure::dns::upstream::UpstreamGroups;
use warden_dns_infrastructure::lists::index::{
    ChainedGroupedIndex, DomainGroupedIndex, IpGroupedIndex,
};
use warden_dns_infrastructure::lists::ListRefresher;
use warden_dns_infrastructure::logging::TracingQueryLogWriter;
use warden_dns_jobs::{CacheMaintenanceJob, JobRunner, ListRefreshJob};

fn chained_index() -> Arc<dyn GroupedRuleIndex> {
    Arc::new(ChainedGroupedIndex::new(vec![
        Arc::new(DomainGroupedIndex::new()),
        Arc::new(IpGroupedIndex::new()),
    ]))
}

/// Compose every subsystem and run the listeners until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let stats = Arc::new(RuntimeStats::new());

    // Rule indices and their initial load. A failing source logs and keeps
    // the (empty) prior snapshot; the refresh job retries later.
    let deny_index = chained_index();
    let allow_index = chained_index();
    let refresher = Arc::new(
        ListRefresher::new(&config.blocking, Arc::clone(&deny_index), Arc::clone(&allow_index))
            .context("building list refresher")?,
    );
    if let Err(e) = refresher.refresh_all(&cancel).await {
        warn!(error = %e, "Initial list refresh incomplete, prior snapshots retained");
    }

    // Optional shared-state broker. Connection failure degrades to
    // process-local operation.
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<BrokerEvent>(1024);
    let broker: Option<Arc<dyn SharedStateBroker>> = match &config.broker {
        Some(broker_config) => {
            match RedisBroker::connect(broker_config, inbound_tx, cancel.clone()).await {
                Ok(broker) => Some(broker),
                Err(e) => {
                    warn!(error = %e, "Shared store unavailable, running process-local");
                    None
                }
            }
        }
        None => None,
    };

    let controller = BlockingController::new(broker.clone());

    let client_lookup: Arc<dyn ClientNameLookup> = if config.client_lookup.upstream.is_some()
        || !config.client_lookup.clients.is_empty()
    {
        Arc::new(
            StaticPtrLookup::new(
                &config.client_lookup,
                Duration::from_millis(config.upstreams.timeout_ms),
            )
            .context("building client lookup")?,
        )
    } else {
        Arc::new(NoClientLookup)
    };

    let (log_tx, _log_handle) = QueryLogResolver::spawn_writer(
        Arc::new(TracingQueryLogWriter),
        cancel.clone(),
    );

    let upstream_groups =
        Arc::new(UpstreamGroups::new(&config.upstreams).context("building upstream groups")?);

    let chain = ResolverBuilder::new(
        config.clone(),
        upstream_groups,
        deny_index,
        allow_index,
        Arc::clone(&controller),
        client_lookup,
        log_tx,
        broker,
    )
    .build()
    .await
    .context("assembling resolver chain")?;

    // Route inbound broker events: peer cache entries into the caching
    // stage, peer toggles into the controller.
    {
        let caching = Arc::clone(&chain.caching);
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            while let Some(event) = inbound_rx.recv().await {
                match event {
                    BrokerEvent::CacheEntry { message: bytes, .. } => {
                        match message::parse(&bytes) {
                            Ok(parsed) => caching.ingest_remote(parsed),
                            Err(e) => warn!(error = %e, "Undecodable peer cache entry"),
                        }
                    }
                    BrokerEvent::BlockingToggle(toggle) => controller.apply_remote(&toggle),
                }
            }
        });
    }

    JobRunner::new()
        .with_list_refresh(
            ListRefreshJob::new(Arc::clone(&refresher))
                .with_interval(config.blocking.refresh_period_secs)
                .with_cancellation(cancel.clone()),
        )
        .with_cache_maintenance(
            CacheMaintenanceJob::new(Arc::clone(chain.caching.cache()))
                .with_interval(config.caching.cleanup_interval_secs)
                .with_cancellation(cancel.clone()),
        )
        .start()
        .await;

    spawn_signal_handlers(config.clone(), Arc::clone(&stats));

    // SIGINT/SIGTERM trigger the graceful drain.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown requested");
            cancel.cancel();
        });
    }

    let handler = ChainRequestHandler::new(
        chain.entry,
        stats,
        Duration::from_millis(config.server.query_timeout_ms),
    );
    let server = DnsServer::new(config.server.clone(), handler);
    server.run(cancel).await.context("running DNS listeners")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term =
            signal(SignalKind::terminate()).expect("SIGTERM handler installation cannot fail");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// SIGUSR1 prints the runtime configuration, SIGUSR2 the rolling stats.
fn spawn_signal_handlers(config: Config, stats: Arc<RuntimeStats>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(async move {
            let mut usr1 = match signal(SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Cannot install SIGUSR1 handler");
                    return;
                }
            };
            let mut usr2 = match signal(SignalKind::user_defined2()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Cannot install SIGUSR2 handler");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = usr1.recv() => {
                        info!("Runtime configuration:\n{}", config.dump());
                    }
                    _ = usr2.recv() => {
                        info!("Statistics snapshot:\n{}", stats.snapshot());
                    }
                }
            }
        });
    }
    #[cfg(not(unix))]
    {
        let _ = (config, stats);
    }
}
