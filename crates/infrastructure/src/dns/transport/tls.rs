use super::tcp::exchange_framed;
use super::DnsTransport;
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;
use warden_dns_domain::DomainError;

/// DNS over TLS (RFC 7858), TLS 1.2+ against the webpki root store.
///
/// The last established connection is kept for reuse; a concurrent query
/// that finds it taken simply dials its own.
pub struct TlsTransport {
    host: String,
    server_addr: SocketAddr,
    connector: TlsConnector,
    idle: Mutex<Option<TlsStream<TcpStream>>>,
}

impl TlsTransport {
    pub fn new(host: String, server_addr: SocketAddr) -> Self {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self {
            host,
            server_addr,
            connector: TlsConnector::from(Arc::new(config)),
            idle: Mutex::new(None),
        }
    }

    async fn connect(&self, timeout: Duration) -> Result<TlsStream<TcpStream>, DomainError> {
        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| DomainError::InvalidConfig(format!("bad TLS name '{}': {e}", self.host)))?;

        let tcp = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| DomainError::UpstreamTimeout)?
            .map_err(|e| DomainError::Io(format!("connect {}: {e}", self.server_addr)))?;

        tokio::time::timeout(timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| DomainError::UpstreamTimeout)?
            .map_err(|e| DomainError::Io(format!("TLS handshake with {}: {e}", self.host)))
    }
}

#[async_trait]
impl DnsTransport for TlsTransport {
    async fn send(&self, message: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError> {
        // Reuse the idle connection when one is parked; fall back to a
        // fresh dial, including when the reused stream errors mid-exchange.
        let reused = {
            let mut idle = self.idle.lock().await;
            idle.take()
        };

        if let Some(mut stream) = reused {
            match exchange_framed(&mut stream, message, timeout).await {
                Ok(response) => {
                    *self.idle.lock().await = Some(stream);
                    return Ok(response);
                }
                Err(e) => {
                    debug!(host = %self.host, error = %e, "Reused DoT connection failed, redialing");
                }
            }
        }

        let mut stream = self.connect(timeout).await?;
        let response = exchange_framed(&mut stream, message, timeout).await?;
        *self.idle.lock().await = Some(stream);
        Ok(response)
    }

    fn protocol_name(&self) -> &'static str {
        "DoT"
    }
}
