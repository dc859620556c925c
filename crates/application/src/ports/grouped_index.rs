use std::net::IpAddr;
use std::sync::Arc;
use warden_dns_domain::RuleEntry;

/// What a rule lookup is keyed on: the query name, or an address taken from
/// an upstream answer.
#[derive(Debug, Clone, Copy)]
pub enum RuleQuery<'a> {
    Name(&'a str),
    Ip(IpAddr),
}

/// Per-group rule membership behind an atomically replaceable snapshot.
pub trait GroupedRuleIndex: Send + Sync {
    /// Subset of `groups` containing `query`, deduplicated and sorted.
    fn contains(&self, query: RuleQuery<'_>, groups: &[Arc<str>]) -> Vec<Arc<str>>;

    /// Single-writer builder for one group; `finish` atomically installs the
    /// new snapshot. Readers keep whatever snapshot they already loaded.
    fn refresh(&self, group: &str) -> Box<dyn RuleIndexFactory>;

    /// Total logical element count of one group's current snapshot.
    fn element_count(&self, group: &str) -> usize;
}

/// Accumulates entries for one group, then installs them wholesale.
pub trait RuleIndexFactory: Send {
    /// Returns whether this index class recognized the entry.
    fn add(&mut self, entry: &RuleEntry) -> bool;

    fn finish(self: Box<Self>);
}
