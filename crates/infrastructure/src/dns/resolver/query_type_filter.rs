use crate::dns::message;
use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use rustc_hash::FxHashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// Drops configured query types (e.g. AAAA) with an empty NOERROR answer.
pub struct QueryTypeFilterResolver {
    types: FxHashSet<RecordType>,
    next: Arc<dyn ChainResolver>,
}

impl QueryTypeFilterResolver {
    pub fn new(type_names: &[String], next: Arc<dyn ChainResolver>) -> Self {
        let mut types = FxHashSet::default();
        for name in type_names {
            match RecordType::from_str(&name.to_ascii_uppercase()) {
                Ok(qtype) => {
                    types.insert(qtype);
                }
                Err(e) => warn!(qtype = %name, error = %e, "Ignoring unknown filtered query type"),
            }
        }
        Self { types, next }
    }
}

#[async_trait]
impl ChainResolver for QueryTypeFilterResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        if let Some(qtype) = request.qtype() {
            if self.types.contains(&qtype) {
                return Ok(DnsResponse::new(
                    message::response_for(&request.message, ResponseCode::NoError),
                    ResponseType::Filtered,
                    format!("FILTERED ({qtype})"),
                ));
            }
        }
        self.next.resolve(request).await
    }

    fn name(&self) -> &'static str {
        "query-type-filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resolver::testing::{request_for, FailingStage, StaticStage};
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_filtered_type_answers_empty_noerror() {
        let stage = QueryTypeFilterResolver::new(&["AAAA".to_string()], Arc::new(FailingStage));
        let response = stage
            .resolve(&request_for("example.com", RecordType::AAAA))
            .await
            .unwrap();
        assert_eq!(response.rtype, ResponseType::Filtered);
        assert_eq!(response.message.response_code(), ResponseCode::NoError);
        assert!(response.message.answers().is_empty());
    }

    #[tokio::test]
    async fn test_other_types_pass() {
        let next = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 60);
        let stage = QueryTypeFilterResolver::new(&["AAAA".to_string()], next.clone());
        stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(next.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_type_name_ignored() {
        let next = StaticStage::new(Ipv4Addr::new(203, 0, 113, 1), 60);
        let stage = QueryTypeFilterResolver::new(&["NOT_A_TYPE".to_string()], next.clone());
        stage
            .resolve(&request_for("example.com", RecordType::A))
            .await
            .unwrap();
        assert_eq!(next.call_count(), 1);
    }
}
