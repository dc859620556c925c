use rustc_hash::FxHashMap;

/// Exact-name membership over length-bucketed sorted concatenations.
///
/// Most list content is short, similar-length domains; bucketing by length
/// and concatenating each bucket into one sorted string gives O(log n)
/// membership with near-minimal heap: one allocation per distinct length.
/// Lookup binary-searches fixed-width slices of the bucket.
#[derive(Default)]
pub struct StringSet {
    /// `name length → sorted concatenation of all names of that length`.
    buckets: FxHashMap<usize, String>,
    len: usize,
}

impl StringSet {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        let width = name.len();
        if width == 0 {
            return false;
        }
        let Some(bucket) = self.buckets.get(&width) else {
            return false;
        };

        let count = bucket.len() / width;
        let (mut lo, mut hi) = (0usize, count);
        while lo < hi {
            let mid = (lo + hi) / 2;
            let slice = &bucket[mid * width..(mid + 1) * width];
            match slice.cmp(name) {
                std::cmp::Ordering::Equal => return true,
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        false
    }
}

#[derive(Default)]
pub struct StringSetBuilder {
    pending: FxHashMap<usize, Vec<String>>,
}

impl StringSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.pending
            .entry(name.len())
            .or_default()
            .push(name.to_string());
    }

    pub fn build(self) -> StringSet {
        let mut buckets = FxHashMap::default();
        let mut len = 0;
        for (width, mut names) in self.pending {
            names.sort_unstable();
            names.dedup();
            len += names.len();
            buckets.insert(width, names.concat());
        }
        StringSet { buckets, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(names: &[&str]) -> StringSet {
        let mut builder = StringSetBuilder::new();
        for name in names {
            builder.add(name);
        }
        builder.build()
    }

    #[test]
    fn test_membership() {
        let set = build(&["ads.com", "tracker.io", "evil.example.org"]);
        assert!(set.contains("ads.com"));
        assert!(set.contains("tracker.io"));
        assert!(set.contains("evil.example.org"));
        assert!(!set.contains("ads.org"));
        assert!(!set.contains("example.org"));
        assert!(!set.contains(""));
    }

    #[test]
    fn test_same_length_bucket_is_searched_correctly() {
        // All of these share one bucket; bisection must land on each.
        let names = ["aaa.com", "bbb.com", "ccc.com", "ddd.com", "eee.com"];
        let set = build(&names);
        for name in names {
            assert!(set.contains(name), "{name} missing");
        }
        assert!(!set.contains("abc.com"));
    }

    #[test]
    fn test_duplicates_counted_once() {
        let set = build(&["ads.com", "ads.com"]);
        assert_eq!(set.len(), 1);
    }
}
