use crate::dns::message;
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_dns_application::blocking_controller::BlockingController;
use warden_dns_application::ports::{ChainResolver, GroupedRuleIndex, RuleQuery};
use warden_dns_domain::config::BlockingConfig;
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError, ResponseType};

/// How a client id in the `client_groups` table is matched.
enum ClientMatcher {
    Name(String),
    Ip(IpAddr),
    Subnet(IpNetwork),
}

impl ClientMatcher {
    fn parse(id: &str) -> Self {
        if let Ok(ip) = id.parse::<IpAddr>() {
            return ClientMatcher::Ip(ip);
        }
        if id.contains('/') {
            match id.parse::<IpNetwork>() {
                Ok(net) => return ClientMatcher::Subnet(net),
                Err(e) => warn!(client = %id, error = %e, "Invalid client subnet, matching by name"),
            }
        }
        ClientMatcher::Name(id.to_ascii_lowercase())
    }

    fn matches(&self, request: &DnsRequest) -> bool {
        match self {
            ClientMatcher::Ip(ip) => *ip == request.client_ip,
            ClientMatcher::Subnet(net) => net.contains(request.client_ip),
            ClientMatcher::Name(name) => request
                .client_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name)),
        }
    }
}

/// Denies or passes each query against the active deny/allow groups.
///
/// Group resolution: the union of every matching `client_groups` rule
/// (name, exact IP, subnet), falling back to the `default` entry. The
/// controller then filters out disabled groups. A whitelist match always
/// wins over a blacklist match. On successful downstream answers the same
/// rules are re-applied to each CNAME target and answer address.
pub struct BlockingResolver {
    deny_index: Arc<dyn GroupedRuleIndex>,
    allow_index: Arc<dyn GroupedRuleIndex>,
    controller: Arc<BlockingController>,
    client_rules: Vec<(ClientMatcher, Vec<Arc<str>>)>,
    default_groups: Vec<Arc<str>>,
    config: BlockingConfig,
    next: Arc<dyn ChainResolver>,
}

impl BlockingResolver {
    pub fn new(
        config: BlockingConfig,
        deny_index: Arc<dyn GroupedRuleIndex>,
        allow_index: Arc<dyn GroupedRuleIndex>,
        controller: Arc<BlockingController>,
        next: Arc<dyn ChainResolver>,
    ) -> Self {
        let mut client_rules = Vec::new();
        let mut default_groups = Vec::new();
        for (id, groups) in &config.client_groups {
            let groups: Vec<Arc<str>> = groups.iter().map(|g| Arc::from(g.as_str())).collect();
            if id == "default" {
                default_groups = groups;
            } else {
                client_rules.push((ClientMatcher::parse(id), groups));
            }
        }

        Self {
            deny_index,
            allow_index,
            controller,
            client_rules,
            default_groups,
            config,
            next,
        }
    }

    fn groups_for_request(&self, request: &DnsRequest) -> Vec<Arc<str>> {
        let mut groups: Vec<Arc<str>> = self
            .client_rules
            .iter()
            .filter(|(matcher, _)| matcher.matches(request))
            .flat_map(|(_, groups)| groups.iter().cloned())
            .collect();
        if groups.is_empty() {
            groups = self.default_groups.clone();
        }
        groups.sort();
        groups.dedup();
        groups
    }

    /// First deny group matching `query`, unless an allow group matches:
    /// whitelist dominance.
    fn blocked_by(&self, query: RuleQuery<'_>, active: &[Arc<str>]) -> Option<Arc<str>> {
        if !self.allow_index.contains(query, active).is_empty() {
            return None;
        }
        self.deny_index.contains(query, active).into_iter().next()
    }

    fn block(&self, request: &DnsRequest, reason: String) -> DnsResponse {
        DnsResponse::new(
            message::blocked_response(&request.message, &self.config),
            ResponseType::Blocked,
            reason,
        )
    }
}

#[async_trait]
impl ChainResolver for BlockingResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let Some(qname) = request.qname() else {
            return self.next.resolve(request).await;
        };

        let configured = self.groups_for_request(request);
        let active = self.controller.active_groups(&configured);

        if active.is_empty() {
            return self.next.resolve(request).await;
        }

        if let Some(group) = self.blocked_by(RuleQuery::Name(&qname), &active) {
            debug!(qname = %qname, group = %group, "Query blocked");
            return Ok(self.block(request, format!("BLOCKED ({group})")));
        }

        let response = self.next.resolve(request).await?;

        if matches!(
            response.rtype,
            ResponseType::Resolved | ResponseType::Cached | ResponseType::Conditional
        ) {
            // Deep CNAME inspection: every target in the answer chain is
            // subject to the same rules, until a terminal match or the
            // chain exhausts.
            if self.config.inspect_cname {
                for target in message::cname_targets(&response.message) {
                    if let Some(group) = self.blocked_by(RuleQuery::Name(&target), &active) {
                        debug!(qname = %qname, cname = %target, group = %group, "CNAME target blocked");
                        return Ok(self.block(request, format!("BLOCKED CNAME ({group})")));
                    }
                }
            }

            for ip in message::answer_ips(&response.message) {
                if let Some(group) = self.blocked_by(RuleQuery::Ip(ip), &active) {
                    debug!(qname = %qname, ip = %ip, group = %group, "Answer address blocked");
                    return Ok(self.block(request, format!("BLOCKED IP ({group})")));
                }
            }
        }

        Ok(response)
    }

    fn name(&self) -> &'static str {
        "blocking"
    }
}
