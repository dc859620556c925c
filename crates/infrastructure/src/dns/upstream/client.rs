use crate::dns::endpoint::UpstreamEndpoint;
use crate::dns::message;
use crate::dns::transport::{DnsTransport, HttpsTransport, TlsTransport, UdpTransport};
use hickory_proto::op::{Message, ResponseCode};
use std::time::Duration;
use warden_dns_domain::DomainError;

/// One upstream resolver: an endpoint bound to its transport.
pub struct UpstreamClient {
    endpoint: UpstreamEndpoint,
    transport: Box<dyn DnsTransport>,
}

impl UpstreamClient {
    pub fn new(endpoint: UpstreamEndpoint) -> Result<Self, DomainError> {
        let transport: Box<dyn DnsTransport> = match &endpoint {
            UpstreamEndpoint::Udp { addr } => Box::new(UdpTransport::new(*addr)),
            UpstreamEndpoint::Tls { host, addr } => {
                Box::new(TlsTransport::new(host.clone(), *addr))
            }
            UpstreamEndpoint::Https { url } => Box::new(HttpsTransport::new(url.clone())?),
        };
        Ok(Self {
            endpoint,
            transport,
        })
    }

    pub fn endpoint(&self) -> &UpstreamEndpoint {
        &self.endpoint
    }

    /// Send one query and decode the answer.
    ///
    /// A SERVFAIL or REFUSED rcode from the upstream surfaces as
    /// `UpstreamRefused`; mismatched transaction ids are rejected.
    pub async fn query(&self, query: &Message, timeout: Duration) -> Result<Message, DomainError> {
        let query_bytes = message::serialize(query)?;
        let response_bytes = self.transport.send(&query_bytes, timeout).await?;
        let response = message::parse(&response_bytes)?;

        if response.id() != query.id() {
            return Err(DomainError::InvalidDnsResponse(format!(
                "transaction id mismatch from {}",
                self.endpoint
            )));
        }

        match response.response_code() {
            ResponseCode::ServFail | ResponseCode::Refused => Err(DomainError::UpstreamRefused),
            _ => Ok(response),
        }
    }
}
