use async_trait::async_trait;
use warden_dns_domain::{DnsResponse, SecurityStatus};

/// Pluggable downstream response validator (DNSSEC lives behind this).
///
/// The core only marks and propagates the verdict.
#[async_trait]
pub trait ResponseValidator: Send + Sync {
    async fn validate(&self, response: &DnsResponse) -> SecurityStatus;
}

/// Default validator: every answer is unvalidated.
pub struct NullValidator;

#[async_trait]
impl ResponseValidator for NullValidator {
    async fn validate(&self, _response: &DnsResponse) -> SecurityStatus {
        SecurityStatus::Indeterminate
    }
}
