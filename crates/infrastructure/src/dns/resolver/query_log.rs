use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use warden_dns_application::ports::{ChainResolver, QueryLogEntry, QueryLogWriter};
use warden_dns_domain::{DnsRequest, DnsResponse, DomainError};

/// Bounded queue between the hot path and the log writer task.
const LOG_CHANNEL_CAPACITY: usize = 4096;

/// Fire-and-forget query logging.
///
/// The entry is enqueued after the rest of the chain produced its outcome;
/// a full queue drops the entry rather than blocking resolution.
pub struct QueryLogResolver {
    tx: mpsc::Sender<QueryLogEntry>,
    next: Arc<dyn ChainResolver>,
}

impl QueryLogResolver {
    pub fn new(tx: mpsc::Sender<QueryLogEntry>, next: Arc<dyn ChainResolver>) -> Self {
        Self { tx, next }
    }

    /// Create the channel and spawn the consumer task draining it into the
    /// external writer. The task exits when cancelled or when every sender
    /// is gone, after draining what is already queued.
    pub fn spawn_writer(
        writer: Arc<dyn QueryLogWriter>,
        cancel: CancellationToken,
    ) -> (mpsc::Sender<QueryLogEntry>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<QueryLogEntry>(LOG_CHANNEL_CAPACITY);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        // Drain whatever is already queued, then stop.
                        while let Ok(entry) = rx.try_recv() {
                            if let Err(e) = writer.write(&entry).await {
                                warn!(error = %e, "Query log write failed during drain");
                            }
                        }
                        debug!("Query log writer stopped");
                        break;
                    }
                    entry = rx.recv() => {
                        match entry {
                            Some(entry) => {
                                if let Err(e) = writer.write(&entry).await {
                                    warn!(error = %e, qname = %entry.qname, "Query log write failed");
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        (tx, handle)
    }
}

#[async_trait]
impl ChainResolver for QueryLogResolver {
    async fn resolve(&self, request: &DnsRequest) -> Result<DnsResponse, DomainError> {
        let result = self.next.resolve(request).await;

        let entry = QueryLogEntry {
            timestamp: Utc::now(),
            client_ip: request.client_ip,
            client_names: request.client_names.clone(),
            qname: request.qname().unwrap_or_default(),
            qtype: request
                .qtype()
                .map(|t| t.to_string().into())
                .unwrap_or_default(),
            rtype: result.as_ref().ok().map(|r| r.rtype),
            reason: match &result {
                Ok(response) => response.reason.clone(),
                Err(e) => e.to_string(),
            },
            duration_ms: request.received_at.elapsed().as_millis() as u64,
        };

        if self.tx.try_send(entry).is_err() {
            debug!("Query log queue full, dropping entry");
        }

        result
    }

    fn name(&self) -> &'static str {
        "query-log"
    }
}
