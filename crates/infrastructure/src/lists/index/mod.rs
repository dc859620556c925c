pub mod chained;
pub mod group_index;
pub mod grouped;
pub mod ip_index;
pub mod regex_set;
pub mod string_set;
pub mod wildcard_set;

pub use chained::ChainedGroupedIndex;
pub use group_index::{GroupSnapshot, GroupSnapshotBuilder};
pub use grouped::DomainGroupedIndex;
pub use ip_index::IpGroupedIndex;
pub use regex_set::{RegexSet, RegexSetBuilder};
pub use string_set::{StringSet, StringSetBuilder};
pub use wildcard_set::{WildcardSet, WildcardSetBuilder};
