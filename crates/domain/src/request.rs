use compact_str::CompactString;
use hickory_proto::op::Message;
use hickory_proto::rr::RecordType;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

/// Transport the query arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProtocol {
    Udp,
    Tcp,
}

impl TransportProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Udp => "UDP",
            TransportProtocol::Tcp => "TCP",
        }
    }
}

/// Immutable per-query value carried through the resolver chain.
///
/// `client_names` is empty until the client-name stage attaches reverse-DNS
/// or statically mapped names; stages after it receive the enriched copy.
#[derive(Debug, Clone)]
pub struct DnsRequest {
    pub client_ip: IpAddr,
    pub client_names: Vec<Arc<str>>,
    pub protocol: TransportProtocol,
    pub message: Message,
    pub received_at: Instant,
}

impl DnsRequest {
    pub fn new(client_ip: IpAddr, protocol: TransportProtocol, message: Message) -> Self {
        Self {
            client_ip,
            client_names: Vec::new(),
            protocol,
            message,
            received_at: Instant::now(),
        }
    }

    pub fn with_client_names(mut self, names: Vec<Arc<str>>) -> Self {
        self.client_names = names;
        self
    }

    /// Query name, lowercased and without the trailing dot.
    pub fn qname(&self) -> Option<CompactString> {
        self.message.queries().first().map(|q| {
            let name = q.name().to_utf8();
            CompactString::from(name.trim_end_matches('.').to_ascii_lowercase())
        })
    }

    pub fn qtype(&self) -> Option<RecordType> {
        self.message.queries().first().map(|q| q.query_type())
    }

    /// Short summary for structured log records.
    pub fn summary(&self) -> String {
        format!(
            "{} {} from {} ({})",
            self.qtype().map(|t| t.to_string()).unwrap_or_default(),
            self.qname().unwrap_or_default(),
            self.client_ip,
            self.protocol.as_str(),
        )
    }
}
