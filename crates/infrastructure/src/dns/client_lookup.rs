use crate::dns::upstream::UpstreamGroup;
use async_trait::async_trait;
use hickory_proto::rr::{RData, RecordType};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use warden_dns_application::ports::ClientNameLookup;
use warden_dns_domain::config::ClientLookupConfig;
use warden_dns_domain::DomainError;

/// Client-name resolution: static map first, reverse DNS second.
pub struct StaticPtrLookup {
    /// Inverted static map: address → names.
    static_names: FxHashMap<IpAddr, Vec<Arc<str>>>,
    /// Upstream for PTR queries; `None` disables reverse lookup.
    ptr_upstream: Option<Arc<UpstreamGroup>>,
}

impl StaticPtrLookup {
    pub fn new(config: &ClientLookupConfig, timeout: Duration) -> Result<Self, DomainError> {
        let mut static_names: FxHashMap<IpAddr, Vec<Arc<str>>> = FxHashMap::default();
        for (name, addresses) in &config.clients {
            let name: Arc<str> = Arc::from(name.to_ascii_lowercase());
            for ip in addresses {
                static_names.entry(*ip).or_default().push(Arc::clone(&name));
            }
        }

        let ptr_upstream = match &config.upstream {
            Some(server) => Some(Arc::new(UpstreamGroup::new(
                "client-lookup",
                &[server.clone()],
                timeout,
                1,
            )?)),
            None => None,
        };

        Ok(Self {
            static_names,
            ptr_upstream,
        })
    }

    pub fn reverse_name(ip: &IpAddr) -> String {
        match ip {
            IpAddr::V4(v4) => {
                let octets = v4.octets();
                format!(
                    "{}.{}.{}.{}.in-addr.arpa",
                    octets[3], octets[2], octets[1], octets[0]
                )
            }
            IpAddr::V6(v6) => {
                let mut nibbles = Vec::with_capacity(32);
                for byte in v6.octets().iter().rev() {
                    nibbles.push(format!("{:x}", byte & 0x0f));
                    nibbles.push(format!("{:x}", (byte >> 4) & 0x0f));
                }
                format!("{}.ip6.arpa", nibbles.join("."))
            }
        }
    }
}

#[async_trait]
impl ClientNameLookup for StaticPtrLookup {
    async fn lookup(&self, ip: IpAddr) -> Vec<Arc<str>> {
        if let Some(names) = self.static_names.get(&ip) {
            return names.clone();
        }

        let Some(upstream) = &self.ptr_upstream else {
            return Vec::new();
        };

        let reverse = Self::reverse_name(&ip);
        match upstream.resolve(&reverse, RecordType::PTR).await {
            Ok(response) => {
                let names: Vec<Arc<str>> = response
                    .answers()
                    .iter()
                    .filter_map(|record| match record.data() {
                        RData::PTR(ptr) => Some(Arc::from(
                            ptr.0.to_utf8().trim_end_matches('.').to_ascii_lowercase(),
                        )),
                        _ => None,
                    })
                    .collect();
                debug!(ip = %ip, names = names.len(), "PTR lookup succeeded");
                names
            }
            Err(e) => {
                debug!(ip = %ip, error = %e, "PTR lookup failed");
                Vec::new()
            }
        }
    }
}

/// Trivial lookup used when client naming is unconfigured.
pub struct NoClientLookup;

#[async_trait]
impl ClientNameLookup for NoClientLookup {
    async fn lookup(&self, _ip: IpAddr) -> Vec<Arc<str>> {
        Vec::new()
    }
}
