use crate::ports::{BlockingToggle, SharedStateBroker};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Snapshot returned by `status()`.
#[derive(Debug, Clone)]
pub struct BlockingStatus {
    pub enabled: bool,
    pub disabled_groups: Vec<Arc<str>>,
    pub auto_enable_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
struct ControllerState {
    all_disabled: bool,
    disabled_groups: HashSet<Arc<str>>,
    auto_enable_at: Option<DateTime<Utc>>,
}

impl ControllerState {
    fn enabled(&self) -> bool {
        !self.all_disabled && self.disabled_groups.is_empty()
    }
}

/// Runtime enable/disable of blocking, with durations and group scopes.
///
/// The only mutable input consumed by the blocking stage. Reads are
/// lock-free snapshot loads; toggles serialize on an exclusive lock that
/// never covers a resolution call. Local toggles are broadcast through the
/// shared-state broker so a fleet converges; peer toggles arrive through
/// `apply_remote` and are not re-broadcast.
pub struct BlockingController {
    state: ArcSwap<ControllerState>,
    broker: Option<Arc<dyn SharedStateBroker>>,
    /// Pending auto re-enable timer; cancelled by any newer toggle.
    pending_timer: Mutex<Option<CancellationToken>>,
}

impl BlockingController {
    pub fn new(broker: Option<Arc<dyn SharedStateBroker>>) -> Arc<Self> {
        Arc::new(Self {
            state: ArcSwap::from_pointee(ControllerState::default()),
            broker,
            pending_timer: Mutex::new(None),
        })
    }

    pub fn status(&self) -> BlockingStatus {
        let state = self.state.load();
        let mut disabled_groups: Vec<Arc<str>> = state.disabled_groups.iter().cloned().collect();
        disabled_groups.sort();
        BlockingStatus {
            enabled: state.enabled(),
            disabled_groups,
            auto_enable_at: state.auto_enable_at,
        }
    }

    /// Filter the client's configured groups down to the currently active
    /// ones. Lock-free.
    pub fn active_groups(&self, configured: &[Arc<str>]) -> Vec<Arc<str>> {
        let state = self.state.load();
        if state.all_disabled {
            return Vec::new();
        }
        configured
            .iter()
            .filter(|g| !state.disabled_groups.contains(*g))
            .cloned()
            .collect()
    }

    pub fn enable(self: &Arc<Self>, groups: Vec<Arc<str>>) {
        let toggle = BlockingToggle {
            enabled: true,
            duration: None,
            groups,
        };
        self.apply(&toggle, true);
    }

    pub fn disable(self: &Arc<Self>, duration: Option<Duration>, groups: Vec<Arc<str>>) {
        let toggle = BlockingToggle {
            enabled: false,
            duration,
            groups,
        };
        self.apply(&toggle, true);
    }

    /// Apply a toggle received from a peer instance. Never re-broadcast.
    pub fn apply_remote(self: &Arc<Self>, toggle: &BlockingToggle) {
        self.apply(toggle, false);
    }

    fn apply(self: &Arc<Self>, toggle: &BlockingToggle, broadcast: bool) {
        {
            let mut pending = self.pending_timer.lock().unwrap();
            if let Some(token) = pending.take() {
                token.cancel();
            }

            let previous = self.state.load();
            let mut next = ControllerState {
                all_disabled: previous.all_disabled,
                disabled_groups: previous.disabled_groups.clone(),
                auto_enable_at: None,
            };

            if toggle.enabled {
                if toggle.groups.is_empty() {
                    next.all_disabled = false;
                    next.disabled_groups.clear();
                } else {
                    for group in &toggle.groups {
                        next.disabled_groups.remove(group);
                    }
                }
            } else {
                if toggle.groups.is_empty() {
                    next.all_disabled = true;
                } else if !next.all_disabled {
                    next.disabled_groups.extend(toggle.groups.iter().cloned());
                }
                if let Some(duration) = toggle.duration {
                    next.auto_enable_at = Some(
                        Utc::now()
                            + chrono::Duration::from_std(duration)
                                .unwrap_or_else(|_| chrono::Duration::zero()),
                    );
                    let token = CancellationToken::new();
                    *pending = Some(token.clone());
                    self.schedule_reenable(duration, toggle.groups.clone(), token);
                }
            }

            info!(
                enabled = next.enabled(),
                groups = ?toggle.groups,
                duration = ?toggle.duration,
                "Blocking state changed"
            );
            self.state.store(Arc::new(next));
        }

        if broadcast {
            if let Some(broker) = &self.broker {
                broker.publish_blocking_toggle(toggle);
            }
        }
    }

    fn schedule_reenable(
        self: &Arc<Self>,
        duration: Duration,
        groups: Vec<Arc<str>>,
        token: CancellationToken,
    ) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Pending re-enable superseded by a newer toggle");
                }
                _ = tokio::time::sleep(duration) => {
                    info!(groups = ?groups, "Blocking re-enabled after timeout");
                    controller.enable(groups);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingBroker {
        toggles: StdMutex<Vec<BlockingToggle>>,
    }

    impl SharedStateBroker for RecordingBroker {
        fn publish_cache_entry(&self, _qname: &str, _message: &[u8]) {}

        fn publish_blocking_toggle(&self, toggle: &BlockingToggle) {
            self.toggles.lock().unwrap().push(toggle.clone());
        }

        fn is_healthy(&self) -> bool {
            true
        }
    }

    fn groups(names: &[&str]) -> Vec<Arc<str>> {
        names.iter().map(|n| Arc::from(*n)).collect()
    }

    #[tokio::test]
    async fn test_starts_enabled() {
        let controller = BlockingController::new(None);
        let status = controller.status();
        assert!(status.enabled);
        assert!(status.disabled_groups.is_empty());
        assert!(status.auto_enable_at.is_none());
    }

    #[tokio::test]
    async fn test_disable_all_empties_active_groups() {
        let controller = BlockingController::new(None);
        controller.disable(None, vec![]);
        assert!(controller.active_groups(&groups(&["ads", "kids"])).is_empty());

        controller.enable(vec![]);
        assert_eq!(controller.active_groups(&groups(&["ads"])), groups(&["ads"]));
    }

    #[tokio::test]
    async fn test_group_scoped_disable() {
        let controller = BlockingController::new(None);
        controller.disable(None, groups(&["ads"]));

        let active = controller.active_groups(&groups(&["ads", "kids"]));
        assert_eq!(active, groups(&["kids"]));

        let status = controller.status();
        assert!(!status.enabled);
        assert_eq!(status.disabled_groups, groups(&["ads"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_disable_reenables() {
        let controller = BlockingController::new(None);
        controller.disable(Some(Duration::from_secs(60)), groups(&["ads"]));
        assert!(controller.status().auto_enable_at.is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        let status = controller.status();
        assert!(status.enabled);
        assert!(status.disabled_groups.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_toggle_cancels_pending_timer() {
        let controller = BlockingController::new(None);
        controller.disable(Some(Duration::from_secs(60)), vec![]);
        controller.disable(None, vec![]);

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;

        // The first toggle's timer must not have re-enabled blocking.
        assert!(!controller.status().enabled);
    }

    #[tokio::test]
    async fn test_local_toggle_broadcast_remote_not() {
        let broker = Arc::new(RecordingBroker::default());
        let controller = BlockingController::new(Some(broker.clone()));

        controller.disable(None, vec![]);
        assert_eq!(broker.toggles.lock().unwrap().len(), 1);

        controller.apply_remote(&BlockingToggle {
            enabled: true,
            duration: None,
            groups: vec![],
        });
        assert_eq!(broker.toggles.lock().unwrap().len(), 1);
        assert!(controller.status().enabled);
    }
}
