use super::group_index::{GroupSnapshot, GroupSnapshotBuilder};
use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;
use warden_dns_application::ports::{GroupedRuleIndex, RuleIndexFactory, RuleQuery};
use warden_dns_domain::RuleEntry;

type SnapshotMap = FxHashMap<Arc<str>, Arc<GroupSnapshot>>;

/// Name-rule grouped index.
///
/// Readers load the whole `group → snapshot` map atomically; a refresh
/// builds one group's snapshot off to the side and RCU-installs it. An
/// in-flight reader keeps its loaded map (and through it the previous
/// snapshot) alive until dropped.
pub struct DomainGroupedIndex {
    groups: Arc<ArcSwap<SnapshotMap>>,
}

impl DomainGroupedIndex {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(ArcSwap::from_pointee(SnapshotMap::default())),
        }
    }
}

impl Default for DomainGroupedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupedRuleIndex for DomainGroupedIndex {
    fn contains(&self, query: RuleQuery<'_>, groups: &[Arc<str>]) -> Vec<Arc<str>> {
        let RuleQuery::Name(raw) = query else {
            return Vec::new();
        };
        let name = raw.trim_end_matches('.').to_ascii_lowercase();

        let map = self.groups.load();
        let mut matched: Vec<Arc<str>> = groups
            .iter()
            .filter(|group| {
                map.get(*group)
                    .is_some_and(|snapshot| snapshot.contains(&name))
            })
            .cloned()
            .collect();
        matched.sort();
        matched.dedup();
        matched
    }

    fn refresh(&self, group: &str) -> Box<dyn RuleIndexFactory> {
        Box::new(DomainGroupFactory {
            group: Arc::from(group),
            builder: GroupSnapshotBuilder::new(),
            groups: Arc::clone(&self.groups),
        })
    }

    fn element_count(&self, group: &str) -> usize {
        self.groups
            .load()
            .get(group)
            .map(|snapshot| snapshot.element_count())
            .unwrap_or(0)
    }
}

struct DomainGroupFactory {
    group: Arc<str>,
    builder: GroupSnapshotBuilder,
    groups: Arc<ArcSwap<SnapshotMap>>,
}

impl RuleIndexFactory for DomainGroupFactory {
    fn add(&mut self, entry: &RuleEntry) -> bool {
        self.builder.add(entry)
    }

    fn finish(self: Box<Self>) {
        // An empty refresh installs nothing; the previous snapshot (if any)
        // stays visible.
        if self.builder.added() == 0 {
            debug!(group = %self.group, "Empty refresh, keeping previous snapshot");
            return;
        }

        let snapshot = Arc::new(self.builder.build());
        let group = self.group;
        self.groups.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(Arc::clone(&group), Arc::clone(&snapshot));
            next
        });
        debug!(group = %group, elements = snapshot.element_count(), "Group snapshot installed");
    }
}
