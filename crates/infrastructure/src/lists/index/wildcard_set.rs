use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    terminal: bool,
}

/// Wildcard membership over a label-reversed trie.
///
/// `*.ads.com` is stored as the path `com → ads` with a terminal marker at
/// the `ads` node. A query matches when its reversed-label walk passes
/// through any terminal node, so `*.ads.com` matches `ads.com` itself and
/// every name below it. Wildcard lists are very dense and share suffixes,
/// which is exactly what the trie collapses.
///
/// Built once per refresh and shared immutably by readers.
#[derive(Default)]
pub struct WildcardSet {
    root: TrieNode,
    len: usize,
}

impl WildcardSet {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when some ancestor-or-self of `name` is a stored suffix.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        let labels: SmallVec<[&str; 8]> = name.split('.').rev().collect();
        let mut node = &self.root;
        for label in labels {
            match node.children.get(label) {
                Some(child) => {
                    if child.terminal {
                        return true;
                    }
                    node = child;
                }
                None => return false,
            }
        }
        false
    }
}

#[derive(Default)]
pub struct WildcardSetBuilder {
    set: WildcardSet,
}

impl WildcardSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a suffix (already stripped of its `*.` prefix).
    pub fn add(&mut self, suffix: &str) {
        let mut node = &mut self.set.root;
        for label in suffix.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        if !node.terminal {
            node.terminal = true;
            self.set.len += 1;
        }
    }

    pub fn build(self) -> WildcardSet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(suffixes: &[&str]) -> WildcardSet {
        let mut builder = WildcardSetBuilder::new();
        for suffix in suffixes {
            builder.add(suffix);
        }
        builder.build()
    }

    #[test]
    fn test_matches_subdomains_and_suffix_itself() {
        let set = build(&["doubleclick.net"]);
        assert!(set.contains("tracking.doubleclick.net"));
        assert!(set.contains("a.b.doubleclick.net"));
        assert!(set.contains("doubleclick.net"));
    }

    #[test]
    fn test_no_label_boundary_confusion() {
        let set = build(&["doubleclick.net"]);
        assert!(!set.contains("doubleclicknet.com"));
        assert!(!set.contains("notdoubleclick.net"));
        assert!(!set.contains("net"));
    }

    #[test]
    fn test_deeper_suffix_does_not_leak_upward() {
        let set = build(&["ads.example.com"]);
        assert!(!set.contains("example.com"));
        assert!(set.contains("x.ads.example.com"));
    }

    #[test]
    fn test_duplicate_suffixes_counted_once() {
        let set = build(&["ads.com", "ads.com"]);
        assert_eq!(set.len(), 1);
    }
}
