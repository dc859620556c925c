pub mod https;
pub mod tcp;
pub mod tls;
pub mod udp;

pub use https::HttpsTransport;
pub use tcp::TcpTransport;
pub use tls::TlsTransport;
pub use udp::UdpTransport;

use async_trait::async_trait;
use std::time::Duration;
use warden_dns_domain::DomainError;

/// One wire protocol to one upstream server.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Exchange one message, honoring the hard per-query timeout.
    async fn send(&self, message: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError>;

    fn protocol_name(&self) -> &'static str;
}
