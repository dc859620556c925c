use serde::{Deserialize, Serialize};

/// Conditional forwarding rule for domain-specific upstream groups.
///
/// Routes queries for a domain suffix to a named upstream group instead of
/// the default group. Useful for:
/// - Local network domains (*.home.lan → router DHCP server)
/// - Corporate domains (*.corp.local → corporate DNS)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionalForward {
    /// Domain suffix to match (e.g. "home.lan"). Matches the domain itself
    /// and all of its subdomains.
    pub domain: String,

    /// Upstream group name (a key of `[upstreams].groups`).
    pub group: String,
}

impl ConditionalForward {
    /// Matches both the exact domain and all subdomains.
    ///
    /// - Rule "home.lan" matches: "home.lan", "nas.home.lan"
    /// - Rule "home.lan" does NOT match: "otherhome.lan", "example.com"
    pub fn matches_domain(&self, query_domain: &str) -> bool {
        let query_lower = query_domain.to_ascii_lowercase();
        let rule_lower = self.domain.to_ascii_lowercase();

        if query_lower == rule_lower {
            return true;
        }

        query_lower.ends_with(&format!(".{rule_lower}"))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConditionalConfig {
    #[serde(default)]
    pub rules: Vec<ConditionalForward>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(domain: &str) -> ConditionalForward {
        ConditionalForward {
            domain: domain.to_string(),
            group: "lan".to_string(),
        }
    }

    #[test]
    fn test_matches_exact_and_subdomain() {
        let r = rule("home.lan");
        assert!(r.matches_domain("home.lan"));
        assert!(r.matches_domain("nas.home.lan"));
        assert!(r.matches_domain("NAS.Home.LAN"));
    }

    #[test]
    fn test_rejects_suffix_collision() {
        let r = rule("home.lan");
        assert!(!r.matches_domain("otherhome.lan"));
        assert!(!r.matches_domain("example.com"));
    }
}
