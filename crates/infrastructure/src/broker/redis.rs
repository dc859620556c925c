use super::envelope::{cache_key, qname_from_key, SyncEnvelope, CACHE_KEY_PREFIX, SYNC_CHANNEL};
use crate::dns::message;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_dns_application::ports::{BlockingToggle, BrokerEvent, SharedStateBroker};
use warden_dns_domain::config::BrokerConfig;
use warden_dns_domain::DomainError;

/// Publish queue depth; overflow drops silently so resolution never waits
/// on the store.
const PUBLISH_QUEUE: usize = 1024;

enum Outbound {
    Cache { qname: String, message: Vec<u8> },
    Enable(BlockingToggle),
}

/// Bidirectional bridge to the shared key/value + pub/sub store.
///
/// Outbound: cache entries are stored under `cache:<qname>` with a TTL
/// equal to the answer's minimum TTL (defaulted when zero) and published on
/// the sync channel; blocking toggles are published only. Inbound: peer
/// envelopes (echo-suppressed by origin id) are forwarded to the
/// composition layer's event channel. On startup the `cache:*` keyspace
/// hydrates the local cache through that same channel.
pub struct RedisBroker {
    origin: Uuid,
    tx: mpsc::Sender<Outbound>,
    healthy: Arc<AtomicBool>,
}

impl RedisBroker {
    pub async fn connect(
        config: &BrokerConfig,
        inbound: mpsc::Sender<BrokerEvent>,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>, DomainError> {
        let client = redis::Client::open(config.address.as_str())
            .map_err(|e| DomainError::BrokerUnavailable(format!("bad address: {e}")))?;

        let manager = connect_with_backoff(&client, config).await?;

        let origin = Uuid::new_v4();
        let instance = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".into());
        info!(origin = %origin, instance = %instance, "Shared-state broker connected");

        let healthy = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel(PUBLISH_QUEUE);

        let broker = Arc::new(Self {
            origin,
            tx,
            healthy: Arc::clone(&healthy),
        });

        hydrate(manager.clone(), &inbound, &cancel).await;

        tokio::spawn(publish_loop(
            manager,
            rx,
            origin,
            config.default_entry_ttl_secs,
            cancel.clone(),
        ));
        tokio::spawn(receive_loop(
            client,
            config.clone(),
            inbound,
            origin,
            Arc::clone(&healthy),
            cancel,
        ));

        Ok(broker)
    }
}

impl SharedStateBroker for RedisBroker {
    fn publish_cache_entry(&self, qname: &str, message: &[u8]) {
        let outbound = Outbound::Cache {
            qname: qname.to_string(),
            message: message.to_vec(),
        };
        if self.tx.try_send(outbound).is_err() {
            debug!(qname = %qname, "Broker publish queue full, dropping cache entry");
        }
    }

    fn publish_blocking_toggle(&self, toggle: &BlockingToggle) {
        if self.tx.try_send(Outbound::Enable(toggle.clone())).is_err() {
            debug!("Broker publish queue full, dropping blocking toggle");
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

async fn connect_with_backoff(
    client: &redis::Client,
    config: &BrokerConfig,
) -> Result<ConnectionManager, DomainError> {
    let mut cooldown = Duration::from_millis(config.connection_cooldown_ms);
    let mut last_error = String::new();

    for attempt in 0..config.connection_attempts.max(1) {
        match client.get_connection_manager().await {
            Ok(manager) => return Ok(manager),
            Err(e) => {
                warn!(attempt, error = %e, "Shared store connection failed");
                last_error = e.to_string();
                tokio::time::sleep(cooldown).await;
                cooldown *= 2;
            }
        }
    }

    Err(DomainError::BrokerUnavailable(last_error))
}

/// Full `cache:*` scan that seeds the local cache through the inbound
/// channel.
async fn hydrate(
    mut manager: ConnectionManager,
    inbound: &mpsc::Sender<BrokerEvent>,
    cancel: &CancellationToken,
) {
    let keys: Vec<String> = {
        let mut iter = match manager
            .scan_match::<_, String>(format!("{CACHE_KEY_PREFIX}*"))
            .await
        {
            Ok(iter) => iter,
            Err(e) => {
                warn!(error = %e, "Cache hydration scan failed");
                return;
            }
        };
        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        keys
    };

    let mut hydrated = 0usize;
    for key in keys {
        if cancel.is_cancelled() {
            return;
        }
        let Some(qname) = qname_from_key(&key) else {
            continue;
        };
        match manager.get::<_, Vec<u8>>(&key).await {
            Ok(bytes) if !bytes.is_empty() => {
                let event = BrokerEvent::CacheEntry {
                    qname: qname.to_string(),
                    message: bytes,
                };
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = inbound.send(event) => {
                        if result.is_err() {
                            return;
                        }
                        hydrated += 1;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => debug!(key = %key, error = %e, "Hydration read failed"),
        }
    }
    info!(entries = hydrated, "Cache hydrated from shared store");
}

async fn publish_loop(
    mut manager: ConnectionManager,
    mut rx: mpsc::Receiver<Outbound>,
    origin: Uuid,
    default_ttl_secs: u64,
    cancel: CancellationToken,
) {
    loop {
        let outbound = tokio::select! {
            _ = cancel.cancelled() => break,
            outbound = rx.recv() => match outbound {
                Some(outbound) => outbound,
                None => break,
            },
        };

        match outbound {
            Outbound::Cache { qname, message: bytes } => {
                // Store with TTL = minimum answer TTL, defaulted when zero.
                let ttl = message::parse(&bytes)
                    .ok()
                    .and_then(|m| message::min_ttl(&m))
                    .map(u64::from)
                    .filter(|ttl| *ttl > 0)
                    .unwrap_or(default_ttl_secs);

                if let Err(e) = manager
                    .set_ex::<_, _, ()>(cache_key(&qname), bytes.as_slice(), ttl)
                    .await
                {
                    debug!(qname = %qname, error = %e, "Cache store write failed");
                }

                let envelope = SyncEnvelope::cache(origin, &qname, &bytes);
                if let Err(e) = manager
                    .publish::<_, _, ()>(SYNC_CHANNEL, envelope.to_json())
                    .await
                {
                    debug!(qname = %qname, error = %e, "Cache publish failed");
                }
            }
            Outbound::Enable(toggle) => {
                let envelope = SyncEnvelope::enable(origin, &toggle);
                if let Err(e) = manager
                    .publish::<_, _, ()>(SYNC_CHANNEL, envelope.to_json())
                    .await
                {
                    warn!(error = %e, "Blocking toggle publish failed");
                }
            }
        }
    }
    debug!("Broker publish loop stopped");
}

async fn receive_loop(
    client: redis::Client,
    config: BrokerConfig,
    inbound: mpsc::Sender<BrokerEvent>,
    origin: Uuid,
    healthy: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut failures = 0u32;
    let mut cooldown = Duration::from_millis(config.connection_cooldown_ms);

    'reconnect: loop {
        if cancel.is_cancelled() {
            break;
        }

        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                failures += 1;
                if failures >= config.connection_attempts.max(1) {
                    warn!(error = %e, "Subscription retry budget exhausted, broker unhealthy");
                    healthy.store(false, Ordering::Relaxed);
                    break;
                }
                warn!(error = %e, "Subscription failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(cooldown) => {}
                }
                cooldown *= 2;
                continue;
            }
        };

        if let Err(e) = pubsub.subscribe(SYNC_CHANNEL).await {
            warn!(error = %e, "Channel subscription failed");
            continue;
        }
        failures = 0;
        cooldown = Duration::from_millis(config.connection_cooldown_ms);
        debug!(channel = SYNC_CHANNEL, "Subscribed to sync channel");

        let mut stream = pubsub.on_message();
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break 'reconnect,
                msg = stream.next() => match msg {
                    Some(msg) => msg,
                    // Stream ended: connection lost, try again.
                    None => continue 'reconnect,
                },
            };

            let Ok(payload) = msg.get_payload::<String>() else {
                continue;
            };
            let Some(envelope) = SyncEnvelope::from_json(&payload) else {
                debug!("Undecodable sync envelope, ignoring");
                continue;
            };
            let Some(event) = envelope.decode(origin) else {
                // Echo of our own publish (or a peer misconfigured with our
                // origin id).
                continue;
            };

            tokio::select! {
                _ = cancel.cancelled() => break 'reconnect,
                result = inbound.send(event) => {
                    if result.is_err() {
                        break 'reconnect;
                    }
                }
            }
        }
    }
    debug!("Broker receive loop stopped");
}
