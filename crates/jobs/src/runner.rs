use crate::{CacheMaintenanceJob, ListRefreshJob};
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for the background jobs.
///
/// Builder pattern: register jobs, then call `.start()` once.
pub struct JobRunner {
    list_refresh: Option<ListRefreshJob>,
    cache_maintenance: Option<CacheMaintenanceJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            list_refresh: None,
            cache_maintenance: None,
        }
    }

    pub fn with_list_refresh(mut self, job: ListRefreshJob) -> Self {
        self.list_refresh = Some(job);
        self
    }

    pub fn with_cache_maintenance(mut self, job: CacheMaintenanceJob) -> Self {
        self.cache_maintenance = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(job) = self.list_refresh {
            Arc::new(job).start().await;
        }

        if let Some(job) = self.cache_maintenance {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
