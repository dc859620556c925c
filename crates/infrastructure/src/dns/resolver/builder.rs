use super::blocking::BlockingResolver;
use super::caching::CachingResolver;
use super::client_name::ClientNameResolver;
use super::conditional::ConditionalResolver;
use super::custom_dns::CustomDnsResolver;
use super::fqdn_filter::FqdnFilterResolver;
use super::hosts_file::HostsFileResolver;
use super::query_log::QueryLogResolver;
use super::query_type_filter::QueryTypeFilterResolver;
use super::special_name::SpecialNameResolver;
use super::upstream::UpstreamResolver;
use crate::dns::upstream::UpstreamGroups;
use std::sync::Arc;
use tokio::sync::mpsc;
use warden_dns_application::blocking_controller::BlockingController;
use warden_dns_application::ports::{
    ChainResolver, ClientNameLookup, GroupedRuleIndex, NullValidator, QueryLogEntry,
    ResponseValidator, SharedStateBroker,
};
use warden_dns_domain::{Config, DomainError};

/// Assembles the fixed stage order:
///
/// client-name → query-log → special-name → fqdn-filter → conditional →
/// custom-DNS → hosts-file → query-type-filter → blocking → caching →
/// upstream
pub struct ResolverBuilder {
    config: Config,
    upstream_groups: Arc<UpstreamGroups>,
    deny_index: Arc<dyn GroupedRuleIndex>,
    allow_index: Arc<dyn GroupedRuleIndex>,
    controller: Arc<BlockingController>,
    client_lookup: Arc<dyn ClientNameLookup>,
    log_tx: mpsc::Sender<QueryLogEntry>,
    broker: Option<Arc<dyn SharedStateBroker>>,
    validator: Arc<dyn ResponseValidator>,
}

/// The assembled chain plus the handles the composition layer needs after
/// startup: the caching stage for broker ingest and maintenance.
pub struct ResolverChain {
    pub entry: Arc<dyn ChainResolver>,
    pub caching: Arc<CachingResolver>,
}

impl ResolverBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        upstream_groups: Arc<UpstreamGroups>,
        deny_index: Arc<dyn GroupedRuleIndex>,
        allow_index: Arc<dyn GroupedRuleIndex>,
        controller: Arc<BlockingController>,
        client_lookup: Arc<dyn ClientNameLookup>,
        log_tx: mpsc::Sender<QueryLogEntry>,
        broker: Option<Arc<dyn SharedStateBroker>>,
    ) -> Self {
        Self {
            config,
            upstream_groups,
            deny_index,
            allow_index,
            controller,
            client_lookup,
            log_tx,
            broker,
            validator: Arc::new(NullValidator),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ResponseValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub async fn build(self) -> Result<ResolverChain, DomainError> {
        // Innermost first.
        let upstream: Arc<dyn ChainResolver> = Arc::new(UpstreamResolver::new(
            Arc::clone(&self.upstream_groups),
            self.validator,
        ));

        let caching = CachingResolver::new(&self.config.caching, self.broker, upstream);
        let mut chain: Arc<dyn ChainResolver> = caching.clone();

        chain = Arc::new(BlockingResolver::new(
            self.config.blocking.clone(),
            self.deny_index,
            self.allow_index,
            self.controller,
            chain,
        ));

        chain = Arc::new(QueryTypeFilterResolver::new(
            &self.config.filtering.query_types,
            chain,
        ));

        chain = Arc::new(HostsFileResolver::load(&self.config.hosts_file, chain).await?);

        chain = Arc::new(CustomDnsResolver::new(&self.config.custom_dns, chain));

        chain = Arc::new(ConditionalResolver::new(
            &self.config.conditional.rules,
            &self.upstream_groups,
            chain,
        )?);

        chain = Arc::new(FqdnFilterResolver::new(
            self.config.filtering.fqdn_only,
            chain,
        ));

        chain = Arc::new(SpecialNameResolver::new(chain));

        chain = Arc::new(QueryLogResolver::new(self.log_tx, chain));

        chain = Arc::new(ClientNameResolver::new(self.client_lookup, chain));

        Ok(ResolverChain {
            entry: chain,
            caching,
        })
    }
}
