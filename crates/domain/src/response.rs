use hickory_proto::op::Message;
use std::fmt;

/// Closed set of pipeline outcomes. Every terminal stage tags its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Resolved,
    Cached,
    Blocked,
    Conditional,
    CustomDns,
    HostsFile,
    Filtered,
    NotFqdn,
    Special,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Resolved => "RESOLVED",
            ResponseType::Cached => "CACHED",
            ResponseType::Blocked => "BLOCKED",
            ResponseType::Conditional => "CONDITIONAL",
            ResponseType::CustomDns => "CUSTOMDNS",
            ResponseType::HostsFile => "HOSTSFILE",
            ResponseType::Filtered => "FILTERED",
            ResponseType::NotFqdn => "NOTFQDN",
            ResponseType::Special => "SPECIAL",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict propagated from the pluggable response validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityStatus {
    Secure,
    Insecure,
    #[default]
    Indeterminate,
}

/// A DNS answer plus the metadata later stages and the dispatcher consume.
#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub message: Message,
    pub rtype: ResponseType,
    /// Short human-readable reason, e.g. `BLOCKED (ads)`.
    pub reason: String,
    pub security: SecurityStatus,
}

impl DnsResponse {
    pub fn new(message: Message, rtype: ResponseType, reason: impl Into<String>) -> Self {
        Self {
            message,
            rtype,
            reason: reason.into(),
            security: SecurityStatus::Indeterminate,
        }
    }

    pub fn with_security(mut self, security: SecurityStatus) -> Self {
        self.security = security;
        self
    }
}
