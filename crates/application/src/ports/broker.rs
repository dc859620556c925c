use std::sync::Arc;
use std::time::Duration;

/// A blocking-toggle event, local or from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingToggle {
    pub enabled: bool,
    /// When disabling: automatic re-enable after this long.
    pub duration: Option<Duration>,
    /// Affected groups; empty means all.
    pub groups: Vec<Arc<str>>,
}

/// Event received from the shared store.
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    /// A peer cached this answer; `message` is the wire-format response.
    CacheEntry { qname: String, message: Vec<u8> },
    BlockingToggle(BlockingToggle),
}

/// Publish side of the shared-state bridge.
///
/// Publishes are fire-and-forget: they enqueue on a bounded channel and drop
/// silently under backpressure, so resolution latency never depends on the
/// store. Inbound events are delivered out-of-band by the broker's receive
/// task. When no broker is configured, callers hold no instance and all
/// state stays process-local.
pub trait SharedStateBroker: Send + Sync {
    fn publish_cache_entry(&self, qname: &str, message: &[u8]);

    fn publish_blocking_toggle(&self, toggle: &BlockingToggle);

    /// False once the connection-retry budget is exhausted.
    fn is_healthy(&self) -> bool;
}
