use super::DnsTransport;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use warden_dns_domain::DomainError;

/// DNS over TCP: two-byte length prefix per RFC 1035 §4.2.2.
pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

pub(super) async fn exchange_framed<S>(
    stream: &mut S,
    message: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, DomainError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    let exchange = async {
        let len = u16::try_from(message.len())
            .map_err(|_| DomainError::Io("query exceeds 64KiB".into()))?;
        stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| DomainError::Io(format!("write length: {e}")))?;
        stream
            .write_all(message)
            .await
            .map_err(|e| DomainError::Io(format!("write query: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| DomainError::Io(format!("flush: {e}")))?;

        let mut len_buf = [0u8; 2];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| DomainError::Io(format!("read length: {e}")))?;
        let response_len = u16::from_be_bytes(len_buf) as usize;

        let mut response = vec![0u8; response_len];
        stream
            .read_exact(&mut response)
            .await
            .map_err(|e| DomainError::Io(format!("read response: {e}")))?;
        Ok(response)
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| DomainError::UpstreamTimeout)?
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(&self, message: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError> {
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| DomainError::UpstreamTimeout)?
            .map_err(|e| DomainError::Io(format!("connect {}: {e}", self.server_addr)))?;

        exchange_framed(&mut stream, message, timeout).await
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}
