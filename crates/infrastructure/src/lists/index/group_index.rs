use super::regex_set::{RegexSet, RegexSetBuilder};
use super::string_set::{StringSet, StringSetBuilder};
use super::wildcard_set::{WildcardSet, WildcardSetBuilder};
use warden_dns_domain::RuleEntry;

/// One group's compiled rules: up to three sub-indices. Immutable once
/// built; replaced wholesale on refresh.
#[derive(Default)]
pub struct GroupSnapshot {
    strings: StringSet,
    wildcards: WildcardSet,
    regexes: RegexSet,
}

impl GroupSnapshot {
    /// Membership of `name` (already lowercased, no trailing dot).
    ///
    /// Checks string → wildcard → regex and short-circuits on the first
    /// hit. The order is a guarantee: regexes cost O(patterns) and are only
    /// consulted when the cheap sets miss. Membership itself is
    /// order-independent across the sub-indices.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.strings.contains(name)
            || self.wildcards.contains(name)
            || self.regexes.matches(name)
    }

    pub fn element_count(&self) -> usize {
        self.strings.len() + self.wildcards.len() + self.regexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }
}

/// Accumulates entries for one group's next snapshot.
#[derive(Default)]
pub struct GroupSnapshotBuilder {
    strings: StringSetBuilder,
    wildcards: WildcardSetBuilder,
    regexes: RegexSetBuilder,
    added: usize,
}

impl GroupSnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entry into the matching sub-index. Returns whether this
    /// class of index recognized the entry (IP rules belong elsewhere).
    pub fn add(&mut self, entry: &RuleEntry) -> bool {
        match entry {
            RuleEntry::Exact(name) => self.strings.add(name),
            RuleEntry::Wildcard(suffix) => self.wildcards.add(suffix),
            RuleEntry::Regex(pattern) => self.regexes.add(pattern),
            RuleEntry::Ip(_) => return false,
        }
        self.added += 1;
        true
    }

    pub fn added(&self) -> usize {
        self.added
    }

    pub fn build(self) -> GroupSnapshot {
        GroupSnapshot {
            strings: self.strings.build(),
            wildcards: self.wildcards.build(),
            regexes: self.regexes.build(),
        }
    }
}
