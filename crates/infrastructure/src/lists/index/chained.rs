use std::sync::Arc;
use warden_dns_application::ports::{GroupedRuleIndex, RuleIndexFactory, RuleQuery};
use warden_dns_domain::RuleEntry;

/// Composition of several grouped indices behind the single-index
/// interface. This is where the multi-source list configuration becomes one
/// lookup: name rules land in the domain index, IP rules in the IP index,
/// and `contains` unions whatever each child matched.
pub struct ChainedGroupedIndex {
    children: Vec<Arc<dyn GroupedRuleIndex>>,
}

impl ChainedGroupedIndex {
    pub fn new(children: Vec<Arc<dyn GroupedRuleIndex>>) -> Self {
        Self { children }
    }
}

impl GroupedRuleIndex for ChainedGroupedIndex {
    fn contains(&self, query: RuleQuery<'_>, groups: &[Arc<str>]) -> Vec<Arc<str>> {
        let mut matched: Vec<Arc<str>> = self
            .children
            .iter()
            .flat_map(|child| child.contains(query, groups))
            .collect();
        matched.sort();
        matched.dedup();
        matched
    }

    fn refresh(&self, group: &str) -> Box<dyn RuleIndexFactory> {
        Box::new(ChainedFactory {
            children: self.children.iter().map(|c| c.refresh(group)).collect(),
        })
    }

    fn element_count(&self, group: &str) -> usize {
        self.children
            .iter()
            .map(|child| child.element_count(group))
            .sum()
    }
}

struct ChainedFactory {
    children: Vec<Box<dyn RuleIndexFactory>>,
}

impl RuleIndexFactory for ChainedFactory {
    /// Fan out until the first child recognizes the entry.
    fn add(&mut self, entry: &RuleEntry) -> bool {
        self.children.iter_mut().any(|child| child.add(entry))
    }

    fn finish(self: Box<Self>) {
        for child in self.children {
            child.finish();
        }
    }
}
