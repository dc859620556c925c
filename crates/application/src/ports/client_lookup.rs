use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;

/// Resolves a client IP to symbolic names (static map, reverse DNS).
///
/// Lookup failure is non-fatal; implementations return an empty list.
#[async_trait]
pub trait ClientNameLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Vec<Arc<str>>;
}
