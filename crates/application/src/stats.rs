use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use warden_dns_domain::ResponseType;

/// Rolling per-process counters, printed on the statistics signal.
pub struct RuntimeStats {
    started_at: Instant,
    pub total: AtomicU64,
    pub blocked: AtomicU64,
    pub cached: AtomicU64,
    pub filtered: AtomicU64,
    pub from_upstream: AtomicU64,
    pub failures: AtomicU64,
}

impl RuntimeStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            from_upstream: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn record(&self, rtype: ResponseType) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match rtype {
            ResponseType::Blocked => &self.blocked,
            ResponseType::Cached => &self.cached,
            ResponseType::Filtered | ResponseType::NotFqdn => &self.filtered,
            _ => &self.from_upstream,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            total: self.total.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            from_upstream: self.from_upstream.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for RuntimeStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub total: u64,
    pub blocked: u64,
    pub cached: u64,
    pub filtered: u64,
    pub from_upstream: u64,
    pub failures: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "uptime:        {}s", self.uptime_secs)?;
        writeln!(f, "queries:       {}", self.total)?;
        writeln!(f, "blocked:       {}", self.blocked)?;
        writeln!(f, "cache hits:    {}", self.cached)?;
        writeln!(f, "filtered:      {}", self.filtered)?;
        writeln!(f, "from upstream: {}", self.from_upstream)?;
        write!(f, "failures:      {}", self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_buckets() {
        let stats = RuntimeStats::new();
        stats.record(ResponseType::Blocked);
        stats.record(ResponseType::Cached);
        stats.record(ResponseType::Resolved);
        stats.record_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 4);
        assert_eq!(snapshot.blocked, 1);
        assert_eq!(snapshot.cached, 1);
        assert_eq!(snapshot.from_upstream, 1);
        assert_eq!(snapshot.failures, 1);
    }
}
