use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use warden_dns_infrastructure::lists::ListRefresher;

/// Scheduled and on-demand rule-list refresh.
///
/// A refresh failure keeps the prior snapshots and is retried with
/// exponential backoff before falling back to the regular cadence.
pub struct ListRefreshJob {
    refresher: Arc<ListRefresher>,
    interval_secs: u64,
    shutdown: CancellationToken,
    trigger: Arc<Notify>,
}

impl ListRefreshJob {
    pub fn new(refresher: Arc<ListRefresher>) -> Self {
        Self {
            refresher,
            interval_secs: 14_400,
            shutdown: CancellationToken::new(),
            trigger: Arc::new(Notify::new()),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Handle for requesting an immediate refresh.
    pub fn trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.trigger)
    }

    pub async fn start(self: Arc<Self>) {
        if self.interval_secs == 0 {
            info!("List refresh ticker disabled");
            return;
        }
        info!(interval_secs = self.interval_secs, "Starting list refresh job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("ListRefreshJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.refresh_with_backoff().await;
                    }
                    _ = self.trigger.notified() => {
                        info!("ListRefreshJob: on-demand refresh requested");
                        self.refresh_with_backoff().await;
                    }
                }
            }
        });
    }

    async fn refresh_with_backoff(&self) {
        let mut backoff = Duration::from_secs(30);
        const MAX_RETRIES: u32 = 4;

        for attempt in 0..=MAX_RETRIES {
            match self.refresher.refresh_all(&self.shutdown).await {
                Ok(()) => {
                    info!("ListRefreshJob: refresh completed");
                    return;
                }
                Err(e) if attempt < MAX_RETRIES => {
                    warn!(attempt, error = %e, retry_in = ?backoff, "ListRefreshJob: refresh failed");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff *= 2;
                }
                Err(e) => {
                    error!(error = %e, "ListRefreshJob: giving up until next tick, prior snapshots retained");
                }
            }
        }
    }
}
