use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use std::net::IpAddr;
use std::sync::Arc;
use warden_dns_domain::{DomainError, ResponseType};

/// One resolved query, handed to the external log writer.
#[derive(Debug, Clone)]
pub struct QueryLogEntry {
    pub timestamp: DateTime<Utc>,
    pub client_ip: IpAddr,
    pub client_names: Vec<Arc<str>>,
    pub qname: CompactString,
    pub qtype: CompactString,
    pub rtype: Option<ResponseType>,
    pub reason: String,
    pub duration_ms: u64,
}

/// External query-log writer (CSV / database / Kafka / logger; all out
/// of scope here). Writes are best-effort and must never block resolution.
#[async_trait]
pub trait QueryLogWriter: Send + Sync {
    async fn write(&self, entry: &QueryLogEntry) -> Result<(), DomainError>;
}
