use super::client::UpstreamClient;
use crate::dns::message;
use hickory_proto::op::Message;
use hickory_proto::rr::RecordType;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use warden_dns_domain::config::{UpstreamsConfig, DEFAULT_UPSTREAM_GROUP};
use warden_dns_domain::DomainError;

const FULL_WEIGHT: u32 = 100;
const MIN_WEIGHT: u32 = 1;

struct WeightedClient {
    client: UpstreamClient,
    /// Halved on failure, restored on success. Weighted-random selection
    /// spreads load so no single provider sees all queries and a failing
    /// resolver is naturally avoided.
    weight: AtomicU32,
}

/// One logical group of equivalent upstream resolvers.
pub struct UpstreamGroup {
    name: Arc<str>,
    clients: Vec<WeightedClient>,
    timeout: Duration,
    attempts: u32,
}

impl UpstreamGroup {
    pub fn new(
        name: &str,
        endpoints: &[String],
        timeout: Duration,
        attempts: u32,
    ) -> Result<Self, DomainError> {
        let clients = endpoints
            .iter()
            .map(|spec| {
                let endpoint = spec.parse()?;
                Ok(WeightedClient {
                    client: UpstreamClient::new(endpoint)?,
                    weight: AtomicU32::new(FULL_WEIGHT),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        if clients.is_empty() {
            return Err(DomainError::InvalidConfig(format!(
                "upstream group '{name}' has no endpoints"
            )));
        }

        Ok(Self {
            name: Arc::from(name),
            clients,
            timeout,
            attempts: attempts.max(1),
        })
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Weighted-random pick, preferring servers not yet tried this query.
    fn pick(&self, tried: &[usize]) -> usize {
        let candidates: Vec<usize> = (0..self.clients.len())
            .filter(|i| !tried.contains(i))
            .collect();
        let candidates = if candidates.is_empty() {
            (0..self.clients.len()).collect()
        } else {
            candidates
        };

        let total: u32 = candidates
            .iter()
            .map(|&i| self.clients[i].weight.load(Ordering::Relaxed))
            .sum();
        let mut roll = fastrand::u32(0..total.max(1));
        for &i in &candidates {
            let weight = self.clients[i].weight.load(Ordering::Relaxed);
            if roll < weight {
                return i;
            }
            roll -= weight;
        }
        candidates[candidates.len() - 1]
    }

    /// Resolve `name`/`qtype`, retrying across resolvers up to the attempt
    /// budget. Retries prefer a resolver not yet tried.
    pub async fn resolve(&self, name: &str, qtype: RecordType) -> Result<Message, DomainError> {
        let mut tried: Vec<usize> = Vec::with_capacity(self.attempts as usize);
        let mut last_error = DomainError::UpstreamTimeout;

        for attempt in 0..self.attempts {
            let index = self.pick(&tried);
            tried.push(index);
            let server = &self.clients[index];

            // Fresh transaction id per attempt.
            let query = message::build_query(name, qtype)?;
            match server.client.query(&query, self.timeout).await {
                Ok(response) => {
                    server.weight.store(FULL_WEIGHT, Ordering::Relaxed);
                    debug!(
                        group = %self.name,
                        server = %server.client.endpoint(),
                        attempt,
                        "Upstream answered"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let weight = server.weight.load(Ordering::Relaxed);
                    server
                        .weight
                        .store((weight / 2).max(MIN_WEIGHT), Ordering::Relaxed);
                    warn!(
                        group = %self.name,
                        server = %server.client.endpoint(),
                        attempt,
                        error = %e,
                        "Upstream attempt failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// All configured groups: the default plus the conditional targets.
pub struct UpstreamGroups {
    groups: FxHashMap<String, Arc<UpstreamGroup>>,
    default: Arc<UpstreamGroup>,
}

impl UpstreamGroups {
    pub fn new(config: &UpstreamsConfig) -> Result<Self, DomainError> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let mut groups = FxHashMap::default();
        for (name, endpoints) in &config.groups {
            groups.insert(
                name.clone(),
                Arc::new(UpstreamGroup::new(name, endpoints, timeout, config.attempts)?),
            );
        }

        let default = groups
            .get(DEFAULT_UPSTREAM_GROUP)
            .cloned()
            .ok_or_else(|| {
                DomainError::InvalidConfig(format!(
                    "upstream group '{DEFAULT_UPSTREAM_GROUP}' is required"
                ))
            })?;

        Ok(Self { groups, default })
    }

    pub fn default_group(&self) -> &Arc<UpstreamGroup> {
        &self.default
    }

    pub fn get(&self, name: &str) -> Option<&Arc<UpstreamGroup>> {
        self.groups.get(name)
    }
}
