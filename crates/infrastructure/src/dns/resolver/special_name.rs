use crate::dns::message;
use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{rdata, RData, Record, RecordType};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

const LOCALHOST_TTL: u32 = 300;

/// Special-use domain names (RFC 6761, RFC 7686) are answered locally and
/// never forwarded: `localhost` resolves to loopback, the others refuse
/// with NXDOMAIN.
pub struct SpecialNameResolver {
    next: Arc<dyn ChainResolver>,
}

impl SpecialNameResolver {
    pub fn new(next: Arc<dyn ChainResolver>) -> Self {
        Self { next }
    }

    fn is_localhost(qname: &str) -> bool {
        qname == "localhost" || qname.ends_with(".localhost")
    }

    fn is_refused_special(qname: &str) -> bool {
        const REFUSED_SUFFIXES: [&str; 3] = ["test", "invalid", "onion"];
        REFUSED_SUFFIXES
            .iter()
            .any(|suffix| qname == *suffix || qname.ends_with(&format!(".{suffix}")))
    }
}

#[async_trait]
impl ChainResolver for SpecialNameResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let Some(qname) = request.qname() else {
            return self.next.resolve(request).await;
        };

        if Self::is_localhost(&qname) {
            let name = request
                .message
                .queries()
                .first()
                .map(|q| q.name().clone())
                .unwrap_or_else(hickory_proto::rr::Name::root);
            let records = match request.qtype() {
                Some(RecordType::A) => vec![Record::from_rdata(
                    name,
                    LOCALHOST_TTL,
                    RData::A(rdata::A::from(Ipv4Addr::LOCALHOST)),
                )],
                Some(RecordType::AAAA) => vec![Record::from_rdata(
                    name,
                    LOCALHOST_TTL,
                    RData::AAAA(rdata::AAAA::from(Ipv6Addr::LOCALHOST)),
                )],
                _ => vec![],
            };
            return Ok(DnsResponse::new(
                message::answer_response(&request.message, records),
                ResponseType::Special,
                "SPECIAL (localhost)",
            ));
        }

        if Self::is_refused_special(&qname) {
            return Ok(DnsResponse::new(
                message::response_for(&request.message, ResponseCode::NXDomain),
                ResponseType::Special,
                format!("SPECIAL ({qname})"),
            ));
        }

        self.next.resolve(request).await
    }

    fn name(&self) -> &'static str {
        "special-name"
    }
}
