use compact_str::CompactString;
use hickory_proto::rr::RecordType;

/// Cache key: `(qname lowercased, qtype)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub qname: CompactString,
    pub qtype: RecordType,
}

impl CacheKey {
    pub fn new(qname: &str, qtype: RecordType) -> Self {
        Self {
            qname: CompactString::from(qname.trim_end_matches('.').to_ascii_lowercase()),
            qtype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        let a = CacheKey::new("Example.COM.", RecordType::A);
        let b = CacheKey::new("example.com", RecordType::A);
        assert_eq!(a, b);

        let c = CacheKey::new("example.com", RecordType::AAAA);
        assert_ne!(a, c);
    }
}
