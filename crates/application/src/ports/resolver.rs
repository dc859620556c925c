use async_trait::async_trait;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError};

/// One stage of the resolution pipeline.
///
/// A stage either produces a terminal response or delegates to the stage it
/// wraps; composition is decorator-style and assembled once at startup, so
/// the hot path involves no runtime type queries.
#[async_trait]
pub trait ChainResolver: Send + Sync {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError>;

    /// Stage name attached to structured error context.
    fn name(&self) -> &'static str;
}
