use crate::dns::upstream::{UpstreamGroup, UpstreamGroups};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use warden_dns_application::ports::ChainResolver;
use warden_dns_domain::config::ConditionalForward;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// Dispatches queries matching a configured domain suffix to that suffix's
/// upstream group instead of the default pool.
pub struct ConditionalResolver {
    rules: Vec<(ConditionalForward, Arc<UpstreamGroup>)>,
    next: Arc<dyn ChainResolver>,
}

impl ConditionalResolver {
    pub fn new(
        rules: &[ConditionalForward],
        groups: &UpstreamGroups,
        next: Arc<dyn ChainResolver>,
    ) -> Result<Self, DomainError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let group = groups.get(&rule.group).cloned().ok_or_else(|| {
                    DomainError::InvalidConfig(format!(
                        "conditional rule '{}' references unknown group '{}'",
                        rule.domain, rule.group
                    ))
                })?;
                Ok((rule.clone(), group))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        Ok(Self { rules, next })
    }
}

#[async_trait]
impl ChainResolver for ConditionalResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let (Some(qname), Some(qtype)) = (request.qname(), request.qtype()) else {
            return self.next.resolve(request).await;
        };

        for (rule, group) in &self.rules {
            if rule.matches_domain(&qname) {
                debug!(qname = %qname, group = %group.name(), "Conditional forward");
                let mut answer = group.resolve(&qname, qtype).await.map_err(|e| {
                    debug!(stage = self.name(), request = %request.summary(), error = %e, "Conditional forward failed");
                    e
                })?;
                let mut header = *answer.header();
            header.set_id(request.message.id());
            answer.set_header(header);
                return Ok(DnsResponse::new(
                    answer,
                    ResponseType::Conditional,
                    format!("CONDITIONAL ({})", rule.domain),
                ));
            }
        }

        self.next.resolve(request).await
    }

    fn name(&self) -> &'static str {
        "conditional"
    }
}
