use super::DnsTransport;
use async_trait::async_trait;
use std::time::Duration;
use warden_dns_domain::DomainError;

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// DNS over HTTPS (RFC 8484): POST to the `/dns-query` endpoint.
///
/// Connection pooling and HTTP/2 multiplexing come from the shared client.
pub struct HttpsTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(url: String) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent("warden-dns")
            .build()
            .map_err(|e| DomainError::Internal(format!("http client: {e}")))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl DnsTransport for HttpsTransport {
    async fn send(&self, message: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
            .timeout(timeout)
            .body(message.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::UpstreamTimeout
                } else {
                    DomainError::Io(format!("POST {}: {e}", self.url))
                }
            })?;

        if !response.status().is_success() {
            return Err(DomainError::InvalidDnsResponse(format!(
                "HTTP {} from {}",
                response.status().as_u16(),
                self.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DomainError::Io(format!("read body from {}: {e}", self.url)))?;
        Ok(body.to_vec())
    }

    fn protocol_name(&self) -> &'static str {
        "DoH"
    }
}
