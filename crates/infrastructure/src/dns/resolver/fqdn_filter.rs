use crate::dns::message;
use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use std::sync::Arc;
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// Refuses single-label (non-dotted) query names when configured, keeping
/// bare hostnames like `nas` from leaking to upstream providers.
pub struct FqdnFilterResolver {
    enabled: bool,
    next: Arc<dyn ChainResolver>,
}

impl FqdnFilterResolver {
    pub fn new(enabled: bool, next: Arc<dyn ChainResolver>) -> Self {
        Self { enabled, next }
    }
}

#[async_trait]
impl ChainResolver for FqdnFilterResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        if self.enabled {
            if let Some(qname) = request.qname() {
                if !qname.contains('.') {
                    return Ok(DnsResponse::new(
                        message::response_for(&request.message, ResponseCode::NXDomain),
                        ResponseType::NotFqdn,
                        "NOTFQDN",
                    ));
                }
            }
        }
        self.next.resolve(request).await
    }

    fn name(&self) -> &'static str {
        "fqdn-filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resolver::testing::{request_for, FailingStage, StaticStage};
    use hickory_proto::rr::RecordType;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_single_label_refused_when_enabled() {
        let stage = FqdnFilterResolver::new(true, Arc::new(FailingStage));
        let response = stage.resolve(&request_for("nas", RecordType::A)).await.unwrap();
        assert_eq!(response.rtype, ResponseType::NotFqdn);
        assert_eq!(response.message.response_code(), ResponseCode::NXDomain);
    }

    #[tokio::test]
    async fn test_dotted_names_pass() {
        let next = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 60);
        let stage = FqdnFilterResolver::new(true, next.clone());
        let response = stage
            .resolve(&request_for("nas.home.lan", RecordType::A))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::Resolved);
        assert_eq!(next.call_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_passes_single_labels() {
        let next = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 60);
        let stage = FqdnFilterResolver::new(false, next.clone());
        stage.resolve(&request_for("nas", RecordType::A)).await.unwrap();
        assert_eq!(next.call_count(), 1);
    }
}
