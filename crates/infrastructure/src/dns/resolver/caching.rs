use crate::cache::{CacheKey, ExpiringCache, ReloadFn};
use crate::dns::message;
use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use warden_dns_application::ports::{ChainResolver, SharedStateBroker};
use warden_dns_domain::config::CachingConfig;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType, TransportProtocol};

/// Serves repeated queries from the expiring cache, with TTLs rewritten to
/// the remaining time. Fresh answers are inserted with a clamped TTL and,
/// when a broker is attached, published to the fleet. Hot keys are
/// re-resolved at expiry through the wrapped stage (prefetch).
pub struct CachingResolver {
    cache: Arc<ExpiringCache>,
    min_ttl: u32,
    max_ttl: u32,
    negative_ttl: u32,
    enabled: bool,
    broker: Option<Arc<dyn SharedStateBroker>>,
    next: Arc<dyn ChainResolver>,
}

impl CachingResolver {
    pub fn new(
        config: &CachingConfig,
        broker: Option<Arc<dyn SharedStateBroker>>,
        next: Arc<dyn ChainResolver>,
    ) -> Arc<Self> {
        let hot_window = Duration::from_secs(config.prefetch_window_secs);

        let cache = if config.prefetching {
            let reload_next = Arc::clone(&next);
            let (min_ttl, max_ttl) = (config.min_ttl_secs, config.max_ttl_secs);
            let reloader: ReloadFn = Arc::new(move |key: CacheKey| {
                let next = Arc::clone(&reload_next);
                Box::pin(async move {
                    let query = message::build_query(&key.qname, key.qtype).ok()?;
                    let request = DnsRequest::new(
                        IpAddr::V4(Ipv4Addr::LOCALHOST),
                        TransportProtocol::Udp,
                        query,
                    );
                    let response = next.resolve(&request).await.ok()?;
                    if response.message.response_code() != ResponseCode::NoError
                        || response.message.answers().is_empty()
                    {
                        return None;
                    }
                    let ttl = clamp_ttl(&response.message, min_ttl, max_ttl);
                    Some((response.message, Duration::from_secs(u64::from(ttl))))
                })
            });
            ExpiringCache::with_reloader(
                config.max_items,
                hot_window,
                config.prefetch_threshold,
                reloader,
            )
        } else {
            ExpiringCache::new(config.max_items, hot_window, config.prefetch_threshold)
        };

        Arc::new(Self {
            cache,
            min_ttl: config.min_ttl_secs,
            max_ttl: config.max_ttl_secs,
            negative_ttl: config.negative_ttl_secs,
            enabled: config.enabled,
            broker,
            next,
        })
    }

    pub fn cache(&self) -> &Arc<ExpiringCache> {
        &self.cache
    }

    /// Store an answer mirrored from a peer instance. The key is derived
    /// from the message's own question.
    pub fn ingest_remote(&self, message: hickory_proto::op::Message) {
        let Some(query) = message.queries().first() else {
            return;
        };
        let key = CacheKey::new(&query.name().to_utf8(), query.query_type());

        let ttl = match message.response_code() {
            ResponseCode::NoError if !message.answers().is_empty() => {
                clamp_ttl(&message, self.min_ttl, self.max_ttl)
            }
            ResponseCode::NXDomain => self.negative_ttl,
            _ => return,
        };

        debug!(qname = %key.qname, qtype = %key.qtype, ttl, "Ingesting peer cache entry");
        self.cache
            .put(key, message, Duration::from_secs(u64::from(ttl)));
    }

    fn store(&self, key: CacheKey, response: &DnsResponse, qname: &str) {
        let ttl = match response.message.response_code() {
            ResponseCode::NoError if !response.message.answers().is_empty() => {
                clamp_ttl(&response.message, self.min_ttl, self.max_ttl)
            }
            ResponseCode::NXDomain => self.negative_ttl,
            _ => return,
        };

        // Insertion clones; the resolving task keeps sole ownership of its
        // message.
        self.cache.put(
            key,
            response.message.clone(),
            Duration::from_secs(u64::from(ttl)),
        );

        if let Some(broker) = &self.broker {
            match message::serialize(&response.message) {
                Ok(bytes) => broker.publish_cache_entry(qname, &bytes),
                Err(e) => warn!(qname = %qname, error = %e, "Cannot publish cache entry"),
            }
        }
    }
}

fn clamp_ttl(message: &hickory_proto::op::Message, min_ttl: u32, max_ttl: u32) -> u32 {
    message::min_ttl(message)
        .unwrap_or(0)
        .clamp(min_ttl, max_ttl)
}

#[async_trait]
impl ChainResolver for CachingResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        if !self.enabled {
            return self.next.resolve(request).await;
        }
        let (Some(qname), Some(qtype)) = (request.qname(), request.qtype()) else {
            return self.next.resolve(request).await;
        };

        let key = CacheKey::new(&qname, qtype);

        if let Some((cached, remaining)) = self.cache.get(&key) {
            let mut answer = cached.message;
            let mut header = *answer.header();
            header.set_id(request.message.id());
            answer.set_header(header);
            message::rewrite_ttls(&mut answer, remaining.as_secs() as u32);
            let reason = if cached.prefetch {
                "CACHED (prefetched)"
            } else {
                "CACHED"
            };
            return Ok(DnsResponse::new(answer, ResponseType::Cached, reason));
        }

        let response = self.next.resolve(request).await?;
        self.store(key, &response, &qname);
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "caching"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resolver::testing::{request_for, StaticStage};
    use hickory_proto::rr::RecordType;
    use std::sync::Mutex;

    fn config() -> CachingConfig {
        CachingConfig {
            prefetch_threshold: 5,
            ..CachingConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_rewrites_remaining_ttl() {
        let upstream = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 300);
        let stage = CachingResolver::new(&config(), None, upstream.clone());

        let first = stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(first.rtype, ResponseType::Resolved);

        tokio::time::advance(Duration::from_secs(100)).await;

        let second = stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(second.rtype, ResponseType::Cached);
        let ttl = message::min_ttl(&second.message).unwrap();
        assert!((195..=200).contains(&ttl), "rewritten ttl was {ttl}");
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_resolved_again() {
        let upstream = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 30);
        let stage = CachingResolver::new(&config(), None, upstream.clone());

        stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        let response = stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::Resolved);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefetch_hot_key() {
        let upstream = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 30);
        let stage = CachingResolver::new(&config(), None, upstream.clone());

        // 20 queries within the hot window, threshold is 5.
        for _ in 0..20 {
            stage
                .resolve(&request_for("example.com", RecordType::A))
                .await
                .unwrap();
        }
        assert_eq!(upstream.call_count(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        stage.cache().run_cleanup();
        tokio::task::yield_now().await;

        // Reload happened in the background; the next client query is a
        // cache hit marked as prefetched.
        let response = stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::Cached);
        assert!(response.reason.contains("prefetched"));
        assert_eq!(upstream.call_count(), 2);
    }

    struct RecordingBroker {
        published: Mutex<Vec<String>>,
    }

    impl SharedStateBroker for RecordingBroker {
        fn publish_cache_entry(&self, qname: &str, _message: &[u8]) {
            self.published.lock().unwrap().push(qname.to_string());
        }

        fn publish_blocking_toggle(
            &self,
            _toggle: &warden_dns_application::ports::BlockingToggle,
        ) {
        }

        fn is_healthy(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_fresh_answers_published() {
        let broker = Arc::new(RecordingBroker {
            published: Mutex::new(Vec::new()),
        });
        let upstream = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 300);
        let stage = CachingResolver::new(&config(), Some(broker.clone()), upstream);

        stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(*broker.published.lock().unwrap(), vec!["example.com"]);

        // Cache hit: no second publish.
        stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(broker.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_remote_entry() {
        let upstream = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 300);
        let stage = CachingResolver::new(&config(), None, upstream.clone());

        // Build a peer answer for a name we never resolved locally.
        let peer_answer = {
            let request = request_for("peer.example.com", RecordType::A);
            upstream.resolve(&request).await.unwrap().message
        };
        stage.ingest_remote(peer_answer);

        let response = stage
            .resolve(&request_for("peer.example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::Cached);
        // Only the ingest-helper resolution hit the upstream stage.
        assert_eq!(upstream.call_count(), 1);
    }
}
