use crate::dns::message;
use crate::lists::parser::ListParser;
use async_trait::async_trait;
use compact_str::CompactString;
use hickory_proto::rr::{rdata, Name, RData, Record, RecordType};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::config::HostsFileConfig;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// Answers A/AAAA and reverse (PTR) queries from a pre-loaded hosts file.
pub struct HostsFileResolver {
    by_name: FxHashMap<CompactString, Vec<IpAddr>>,
    by_addr: FxHashMap<IpAddr, Vec<CompactString>>,
    ttl: u32,
    next: Arc<dyn ChainResolver>,
}

impl HostsFileResolver {
    /// Load the configured hosts file. A missing configuration yields a
    /// transparent stage.
    pub async fn load(
        config: &HostsFileConfig,
        next: Arc<dyn ChainResolver>,
    ) -> Result<Self, DomainError> {
        let mut by_name: FxHashMap<CompactString, Vec<IpAddr>> = FxHashMap::default();
        let mut by_addr: FxHashMap<IpAddr, Vec<CompactString>> = FxHashMap::default();

        if let Some(path) = &config.path {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                DomainError::ListSource(format!("hosts file {}: {e}", path.display()))
            })?;
            let mut parser = ListParser::hosts(BufReader::new(file)).with_error_callback(
                Box::new(|e| warn!(error = %e, "Skipping hosts file line")),
            );

            let mut entries = 0usize;
            while let Some(entry) = parser.next_entry().await? {
                let crate::lists::parser::ListEntry::Hosts(hosts) = entry else {
                    continue;
                };
                if config.filter_loopback && hosts.ip.is_loopback() {
                    continue;
                }
                for name in &hosts.names {
                    by_name.entry(name.clone()).or_default().push(hosts.ip);
                }
                by_addr
                    .entry(hosts.ip)
                    .or_default()
                    .extend(hosts.names.iter().cloned());
                entries += 1;
            }
            info!(path = %path.display(), entries, "Hosts file loaded");
        }

        Ok(Self {
            by_name,
            by_addr,
            ttl: config.ttl_secs,
            next,
        })
    }

    /// `4.3.2.1.in-addr.arpa` / nibble-format `ip6.arpa` back to an address.
    fn parse_reverse_name(qname: &str) -> Option<IpAddr> {
        if let Some(prefix) = qname.strip_suffix(".in-addr.arpa") {
            let octets: Vec<u8> = prefix
                .split('.')
                .map(|part| part.parse::<u8>())
                .collect::<Result<_, _>>()
                .ok()?;
            if octets.len() != 4 {
                return None;
            }
            return Some(IpAddr::from([octets[3], octets[2], octets[1], octets[0]]));
        }

        if let Some(prefix) = qname.strip_suffix(".ip6.arpa") {
            let nibbles: Vec<u8> = prefix
                .split('.')
                .map(|part| u8::from_str_radix(part, 16))
                .collect::<Result<_, _>>()
                .ok()?;
            if nibbles.len() != 32 || nibbles.iter().any(|n| *n > 0xf) {
                return None;
            }
            let mut bytes = [0u8; 16];
            // The name lists nibbles low-order first; the final pair forms
            // the leading byte.
            for (i, pair) in nibbles.rchunks(2).enumerate() {
                bytes[i] = (pair[1] << 4) | pair[0];
            }
            return Some(IpAddr::from(bytes));
        }

        None
    }

    fn answer_forward(&self, request: &DnsRequest, qname: &str, qtype: RecordType) -> Option<Vec<Record>> {
        let addresses = self.by_name.get(qname)?;
        let name = request.message.queries().first()?.name().clone();

        let records: Vec<Record> = addresses
            .iter()
            .filter_map(|ip| match (qtype, ip) {
                (RecordType::A, IpAddr::V4(v4)) => {
                    Some(Record::from_rdata(name.clone(), self.ttl, RData::A(rdata::A::from(*v4))))
                }
                (RecordType::AAAA, IpAddr::V6(v6)) => Some(Record::from_rdata(
                    name.clone(),
                    self.ttl,
                    RData::AAAA(rdata::AAAA::from(*v6)),
                )),
                _ => None,
            })
            .collect();

        if records.is_empty() {
            None
        } else {
            Some(records)
        }
    }

    fn answer_reverse(&self, request: &DnsRequest, qname: &str) -> Option<Vec<Record>> {
        let ip = Self::parse_reverse_name(qname)?;
        let names = self.by_addr.get(&ip)?;
        let query_name = request.message.queries().first()?.name().clone();

        let records: Vec<Record> = names
            .iter()
            .filter_map(|name| {
                let target = Name::from_str(&format!("{name}.")).ok()?;
                Some(Record::from_rdata(
                    query_name.clone(),
                    self.ttl,
                    RData::PTR(rdata::PTR(target)),
                ))
            })
            .collect();

        if records.is_empty() {
            None
        } else {
            Some(records)
        }
    }
}

#[async_trait]
impl ChainResolver for HostsFileResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let (Some(qname), Some(qtype)) = (request.qname(), request.qtype()) else {
            return self.next.resolve(request).await;
        };

        let records = match qtype {
            RecordType::PTR => self.answer_reverse(request, &qname),
            _ => self.answer_forward(request, &qname, qtype),
        };

        if let Some(records) = records {
            return Ok(DnsResponse::new(
                message::answer_response(&request.message, records),
                ResponseType::HostsFile,
                "HOSTSFILE",
            ));
        }

        self.next.resolve(request).await
    }

    fn name(&self) -> &'static str {
        "hosts-file"
    }
}
