use super::{DnsTransport, TcpTransport};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};
use warden_dns_domain::DomainError;

/// Maximum UDP DNS response size with EDNS(0).
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Truncation bit in the third header byte.
const TC_FLAG: u8 = 0x02;

/// Plain DNS over UDP with automatic TCP retry on truncated answers.
pub struct UdpTransport {
    server_addr: SocketAddr,
    tcp_fallback: TcpTransport,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            tcp_fallback: TcpTransport::new(server_addr),
        }
    }

    async fn exchange(&self, message: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            "0.0.0.0:0".parse().expect("valid literal")
        } else {
            "[::]:0".parse().expect("valid literal")
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DomainError::Io(format!("bind UDP socket: {e}")))?;

        tokio::time::timeout(timeout, socket.send_to(message, self.server_addr))
            .await
            .map_err(|_| DomainError::UpstreamTimeout)?
            .map_err(|e| DomainError::Io(format!("send to {}: {e}", self.server_addr)))?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (len, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| DomainError::UpstreamTimeout)?
            .map_err(|e| DomainError::Io(format!("recv from {}: {e}", self.server_addr)))?;

        if from.ip() != self.server_addr.ip() {
            warn!(
                expected = %self.server_addr,
                received_from = %from,
                "UDP response from unexpected source"
            );
            return Err(DomainError::InvalidDnsResponse(
                "response from unexpected source".into(),
            ));
        }

        buf.truncate(len);
        Ok(buf)
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(&self, message: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError> {
        let response = self.exchange(message, timeout).await?;

        if response.len() > 2 && response[2] & TC_FLAG != 0 {
            debug!(server = %self.server_addr, "Truncated UDP answer, retrying over TCP");
            return self.tcp_fallback.send(message, timeout).await;
        }

        Ok(response)
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
