use crate::dns::message;
use async_trait::async_trait;
use hickory_proto::rr::{rdata, Name, RData, Record, RecordType};
use std::net::IpAddr;
use std::sync::Arc;
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::config::CustomDnsConfig;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// Static per-domain overrides. A mapping for `example.com` answers
/// `example.com` and every name below it.
pub struct CustomDnsResolver {
    /// `(domain, addresses)`, longest domain first so the most specific
    /// mapping wins.
    mapping: Vec<(String, Vec<IpAddr>)>,
    ttl: u32,
    filter_unmapped_types: bool,
    next: Arc<dyn ChainResolver>,
}

impl CustomDnsResolver {
    pub fn new(config: &CustomDnsConfig, next: Arc<dyn ChainResolver>) -> Self {
        let mut mapping: Vec<(String, Vec<IpAddr>)> = config
            .mapping
            .iter()
            .map(|(domain, ips)| (domain.to_ascii_lowercase(), ips.clone()))
            .collect();
        mapping.sort_by_key(|(domain, _)| std::cmp::Reverse(domain.len()));

        Self {
            mapping,
            ttl: config.ttl_secs,
            filter_unmapped_types: config.filter_unmapped_types,
            next,
        }
    }

    fn find(&self, qname: &str) -> Option<&Vec<IpAddr>> {
        self.mapping
            .iter()
            .find(|(domain, _)| qname == domain || qname.ends_with(&format!(".{domain}")))
            .map(|(_, ips)| ips)
    }
}

#[async_trait]
impl ChainResolver for CustomDnsResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let (Some(qname), Some(qtype)) = (request.qname(), request.qtype()) else {
            return self.next.resolve(request).await;
        };

        let Some(addresses) = self.find(&qname) else {
            return self.next.resolve(request).await;
        };

        let name = request
            .message
            .queries()
            .first()
            .map(|q| q.name().clone())
            .unwrap_or_else(Name::root);

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

        if records.is_empty() && !self.filter_unmapped_types {
            return self.next.resolve(request).await;
        }

        Ok(DnsResponse::new(
            message::answer_response(&request.message, records),
            ResponseType::CustomDns,
            format!("CUSTOMDNS ({qname})"),
        ))
    }

    fn name(&self) -> &'static str {
        "custom-dns"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resolver::testing::{request_for, FailingStage, StaticStage};
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    fn config(filter_unmapped: bool) -> CustomDnsConfig {
        CustomDnsConfig {
            mapping: HashMap::from([(
                "printer.lan".to_string(),
                vec!["192.168.1.9".parse().unwrap()],
            )]),
            ttl_secs: 120,
            filter_unmapped_types: filter_unmapped,
        }
    }

    #[tokio::test]
    async fn test_mapped_domain_answered() {
        let stage = CustomDnsResolver::new(&config(true), Arc::new(FailingStage));
        let response = stage
            .resolve(&request_for("printer.lan", RecordType::A))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::CustomDns);
        assert_eq!(
            message::answer_ips(&response.message),
            vec!["192.168.1.9".parse::<IpAddr>().unwrap()]
        );
        assert_eq!(message::min_ttl(&response.message), Some(120));
    }

    #[tokio::test]
    async fn test_subdomain_covered() {
        let stage = CustomDnsResolver::new(&config(true), Arc::new(FailingStage));
        let response = stage
            .resolve(&request_for("scan.printer.lan", RecordType::A))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::CustomDns);
    }

    #[tokio::test]
    async fn test_unmapped_type_filtered() {
        let stage = CustomDnsResolver::new(&config(true), Arc::new(FailingStage));
        let response = stage
            .resolve(&request_for("printer.lan", RecordType::AAAA))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::CustomDns);
        assert!(response.message.answers().is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_type_forwarded_when_not_filtering() {
        let next = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 60);
        let stage = CustomDnsResolver::new(&config(false), next.clone());
        let response = stage
            .resolve(&request_for("printer.lan", RecordType::AAAA))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::Resolved);
        assert_eq!(next.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_domain_passes_through() {
        let next = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 60);
        let stage = CustomDnsResolver::new(&config(true), next.clone());
        stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(next.call_count(), 1);
    }
}
