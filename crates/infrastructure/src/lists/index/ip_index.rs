use arc_swap::ArcSwap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;
use warden_dns_application::ports::{GroupedRuleIndex, RuleIndexFactory, RuleQuery};
use warden_dns_domain::RuleEntry;

type IpMap = FxHashMap<Arc<str>, Arc<FxHashSet<IpAddr>>>;

/// Grouped index over IP-literal rules, consulted with the addresses of
/// upstream answers. Same snapshot discipline as the name index.
pub struct IpGroupedIndex {
    groups: Arc<ArcSwap<IpMap>>,
}

impl IpGroupedIndex {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(ArcSwap::from_pointee(IpMap::default())),
        }
    }
}

impl Default for IpGroupedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupedRuleIndex for IpGroupedIndex {
    fn contains(&self, query: RuleQuery<'_>, groups: &[Arc<str>]) -> Vec<Arc<str>> {
        let RuleQuery::Ip(ip) = query else {
            return Vec::new();
        };

        let map = self.groups.load();
        let mut matched: Vec<Arc<str>> = groups
            .iter()
            .filter(|group| map.get(*group).is_some_and(|set| set.contains(&ip)))
            .cloned()
            .collect();
        matched.sort();
        matched.dedup();
        matched
    }

    fn refresh(&self, group: &str) -> Box<dyn RuleIndexFactory> {
        Box::new(IpGroupFactory {
            group: Arc::from(group),
            addresses: FxHashSet::default(),
            groups: Arc::clone(&self.groups),
        })
    }

    fn element_count(&self, group: &str) -> usize {
        self.groups
            .load()
            .get(group)
            .map(|set| set.len())
            .unwrap_or(0)
    }
}

struct IpGroupFactory {
    group: Arc<str>,
    addresses: FxHashSet<IpAddr>,
    groups: Arc<ArcSwap<IpMap>>,
}

impl RuleIndexFactory for IpGroupFactory {
    fn add(&mut self, entry: &RuleEntry) -> bool {
        match entry {
            RuleEntry::Ip(ip) => {
                self.addresses.insert(*ip);
                true
            }
            _ => false,
        }
    }

    fn finish(self: Box<Self>) {
        if self.addresses.is_empty() {
            return;
        }
        let set = Arc::new(self.addresses);
        let group = self.group;
        self.groups.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(Arc::clone(&group), Arc::clone(&set));
            next
        });
        debug!(group = %group, addresses = set.len(), "IP group snapshot installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<Arc<str>> {
        names.iter().map(|n| Arc::from(*n)).collect()
    }

    #[test]
    fn test_ip_membership() {
        let index = IpGroupedIndex::new();
        let mut factory = index.refresh("ads");
        assert!(factory.add(&RuleEntry::from_token("203.0.113.7").unwrap()));
        assert!(!factory.add(&RuleEntry::from_token("ads.example.com").unwrap()));
        factory.finish();

        let matched = index.contains(
            RuleQuery::Ip("203.0.113.7".parse().unwrap()),
            &groups(&["ads"]),
        );
        assert_eq!(matched, groups(&["ads"]));

        assert!(index
            .contains(RuleQuery::Ip("203.0.113.8".parse().unwrap()), &groups(&["ads"]))
            .is_empty());
        assert!(index
            .contains(RuleQuery::Name("203.0.113.7"), &groups(&["ads"]))
            .is_empty());
    }
}
