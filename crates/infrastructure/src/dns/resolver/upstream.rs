use crate::dns::upstream::UpstreamGroups;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use warden_dns_application::ports::{ChainResolver, ResponseValidator};
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// Terminal stage: forward to the default upstream group and propagate the
/// validator's verdict on the answer.
pub struct UpstreamResolver {
    groups: Arc<UpstreamGroups>,
    validator: Arc<dyn ResponseValidator>,
}

impl UpstreamResolver {
    pub fn new(groups: Arc<UpstreamGroups>, validator: Arc<dyn ResponseValidator>) -> Self {
        Self { groups, validator }
    }
}

#[async_trait]
impl ChainResolver for UpstreamResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let (Some(qname), Some(qtype)) = (request.qname(), request.qtype()) else {
            return Err(DomainError::InvalidDnsResponse("request without question".into()));
        };

        let mut answer = self
            .groups
            .default_group()
            .resolve(&qname, qtype)
            .await
            .map_err(|e| {
                debug!(stage = self.name(), request = %request.summary(), error = %e, "Resolution failed");
                e
            })?;
        let mut header = *answer.header();
            header.set_id(request.message.id());
            answer.set_header(header);

        let response = DnsResponse::new(answer, ResponseType::Resolved, "RESOLVED");
        let security = self.validator.validate(&response).await;
        Ok(response.with_security(security))
    }

    fn name(&self) -> &'static str {
        "upstream"
    }
}
