use async_trait::async_trait;
use std::sync::Arc;
use warden_dns_application::ports::{ChainResolver, ClientNameLookup};
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError};

/// Attaches symbolic client names (reverse DNS / static map) to the request
/// for the per-group decisions further down the chain. Lookup failure is
/// non-fatal.
pub struct ClientNameResolver {
    lookup: Arc<dyn ClientNameLookup>,
    next: Arc<dyn ChainResolver>,
}

impl ClientNameResolver {
    pub fn new(lookup: Arc<dyn ClientNameLookup>, next: Arc<dyn ChainResolver>) -> Self {
        Self { lookup, next }
    }
}

#[async_trait]
impl ChainResolver for ClientNameResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let names = self.lookup.lookup(request.client_ip).await;
        if names.is_empty() {
            return self.next.resolve(request).await;
        }
        let enriched = request.clone().with_client_names(names);
        self.next.resolve(&enriched).await
    }

    fn name(&self) -> &'static str {
        "client-name"
    }
}
