use async_trait::async_trait;
use tracing::info;
use warden_dns_application::ports::{QueryLogEntry, QueryLogWriter};
use warden_dns_domain::DomainError;

/// Query-log writer emitting structured `tracing` records.
///
/// The external CSV/database/Kafka writers live behind the same port; this
/// is the in-process default.
pub struct TracingQueryLogWriter;

#[async_trait]
impl QueryLogWriter for TracingQueryLogWriter {
    async fn write(&self, entry: &QueryLogEntry) -> Result<(), DomainError> {
        info!(
            target: "query_log",
            client = %entry.client_ip,
            client_names = ?entry.client_names,
            qname = %entry.qname,
            qtype = %entry.qtype,
            rtype = entry.rtype.map(|t| t.as_str()).unwrap_or("ERROR"),
            reason = %entry.reason,
            duration_ms = entry.duration_ms,
            "query"
        );
        Ok(())
    }
}
