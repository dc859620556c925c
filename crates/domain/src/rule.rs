use crate::errors::DomainError;
use compact_str::CompactString;
use std::fmt;
use std::net::IpAddr;

/// One normalized entry from a rule source.
///
/// Classification:
/// - `/pattern/`  → Regex
/// - `*.suffix`   → Wildcard (suffix stored without the `*.`)
/// - IP literal   → Ip
/// - anything else with a dot structure → Exact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEntry {
    Exact(CompactString),
    Wildcard(CompactString),
    Regex(String),
    Ip(IpAddr),
}

impl RuleEntry {
    /// Classify and normalize a single rule token.
    ///
    /// Names are lowercased and IDNA-punycoded with the permissive profile;
    /// validating that the result is a *plausible* domain is the list's job,
    /// not ours.
    pub fn from_token(token: &str) -> Result<Self, DomainError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DomainError::InvalidDomainName("empty rule".into()));
        }

        if token.starts_with('/') && token.ends_with('/') && token.len() > 2 {
            return Ok(RuleEntry::Regex(token[1..token.len() - 1].to_string()));
        }

        if let Ok(ip) = token.parse::<IpAddr>() {
            return Ok(RuleEntry::Ip(ip));
        }

        if let Some(suffix) = token.strip_prefix("*.") {
            if suffix.is_empty() || suffix.contains('*') {
                return Err(DomainError::InvalidDomainName(format!(
                    "malformed wildcard '{token}'"
                )));
            }
            return Ok(RuleEntry::Wildcard(normalize_domain(suffix)?));
        }

        if token.contains('*') {
            return Err(DomainError::InvalidDomainName(format!(
                "'*' is only allowed as a leading label: '{token}'"
            )));
        }

        Ok(RuleEntry::Exact(normalize_domain(token)?))
    }
}

impl fmt::Display for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleEntry::Exact(name) => write!(f, "{name}"),
            RuleEntry::Wildcard(suffix) => write!(f, "*.{suffix}"),
            RuleEntry::Regex(pattern) => write!(f, "/{pattern}/"),
            RuleEntry::Ip(ip) => write!(f, "{ip}"),
        }
    }
}

/// Lowercase a name, strip the trailing dot, and punycode non-ASCII labels.
pub fn normalize_domain(raw: &str) -> Result<CompactString, DomainError> {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DomainError::InvalidDomainName("empty name".into()));
    }

    if trimmed.is_ascii() {
        return Ok(CompactString::from(trimmed.to_ascii_lowercase()));
    }

    idna::domain_to_ascii(trimmed)
        .map(CompactString::from)
        .map_err(|e| DomainError::InvalidDomainName(format!("'{trimmed}': {e}")))
}
