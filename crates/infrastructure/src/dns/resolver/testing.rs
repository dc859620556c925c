//! Shared helpers for stage unit tests.

use crate::dns::message;
use async_trait::async_trait;
use hickory_proto::rr::{rdata, Name, RData, Record, RecordType};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType, TransportProtocol};

pub fn request_for(name: &str, qtype: RecordType) -> DnsRequest {
    let message = message::build_query(name, qtype).expect("valid test name");
    DnsRequest::new(
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)),
        TransportProtocol::Udp,
        message,
    )
}

/// Terminal stage that must not be reached.
pub struct FailingStage;

#[async_trait]
impl ChainResolver for FailingStage {
    async fn resolve(&self, _request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        Err(DomainError::Internal("next stage reached".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Terminal stage answering a fixed A record and counting invocations.
pub struct StaticStage {
    pub ip: Ipv4Addr,
    pub ttl: u32,
    pub calls: AtomicUsize,
}

impl StaticStage {
    pub fn new(ip: Ipv4Addr, ttl: u32) -> Arc<Self> {
        Arc::new(Self {
            ip,
            ttl,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainResolver for StaticStage {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = request
            .message
            .queries()
            .first()
            .map(|q| q.name().clone())
            .unwrap_or_else(|| Name::from_str(".").unwrap());
        let record = Record::from_rdata(name, self.ttl, RData::A(rdata::A::from(self.ip)));
        Ok(DnsResponse::new(
            message::answer_response(&request.message, vec![record]),
            ResponseType::Resolved,
            "RESOLVED (static)",
        ))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
