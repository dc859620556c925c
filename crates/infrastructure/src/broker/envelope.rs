use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use warden_dns_application::ports::{BlockingToggle, BrokerEvent};

/// Pub/sub channel carrying the sync envelopes.
pub const SYNC_CHANNEL: &str = "warden_dns_sync";

/// Key prefix for mirrored cache entries.
pub const CACHE_KEY_PREFIX: &str = "cache:";

const TYPE_CACHE: u8 = 0;
const TYPE_ENABLE: u8 = 1;

/// JSON envelope exchanged on the sync channel:
/// `{k: qname, t: 0|1, m: base64 payload, c: origin uuid}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub k: String,
    pub t: u8,
    pub m: String,
    pub c: Uuid,
}

/// Payload of an enable-channel message.
#[derive(Debug, Serialize, Deserialize)]
struct TogglePayload {
    enabled: bool,
    duration_secs: Option<u64>,
    groups: Vec<String>,
}

impl SyncEnvelope {
    pub fn cache(origin: Uuid, qname: &str, message: &[u8]) -> Self {
        Self {
            k: qname.to_string(),
            t: TYPE_CACHE,
            m: BASE64.encode(message),
            c: origin,
        }
    }

    pub fn enable(origin: Uuid, toggle: &BlockingToggle) -> Self {
        let payload = TogglePayload {
            enabled: toggle.enabled,
            duration_secs: toggle.duration.map(|d| d.as_secs()),
            groups: toggle.groups.iter().map(|g| g.to_string()).collect(),
        };
        Self {
            k: String::new(),
            t: TYPE_ENABLE,
            m: BASE64.encode(serde_json::to_vec(&payload).unwrap_or_default()),
            c: origin,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Decode into a broker event. Messages carrying our own origin id are
    /// echo and yield `None`.
    pub fn decode(&self, self_origin: Uuid) -> Option<BrokerEvent> {
        if self.c == self_origin {
            return None;
        }

        let payload = BASE64.decode(&self.m).ok()?;
        match self.t {
            TYPE_CACHE => Some(BrokerEvent::CacheEntry {
                qname: self.k.clone(),
                message: payload,
            }),
            TYPE_ENABLE => {
                let toggle: TogglePayload = serde_json::from_slice(&payload).ok()?;
                Some(BrokerEvent::BlockingToggle(BlockingToggle {
                    enabled: toggle.enabled,
                    duration: toggle.duration_secs.map(Duration::from_secs),
                    groups: toggle.groups.iter().map(|g| Arc::from(g.as_str())).collect(),
                }))
            }
            _ => None,
        }
    }
}

/// `cache:<qname>` storage key for a mirrored entry.
pub fn cache_key(qname: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{qname}")
}

/// Back from storage key to qname.
pub fn qname_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(CACHE_KEY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let origin = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let envelope = SyncEnvelope::cache(origin, "example.com", b"\x12\x34");

        let parsed = SyncEnvelope::from_json(&envelope.to_json()).unwrap();
        match parsed.decode(peer) {
            Some(BrokerEvent::CacheEntry { qname, message }) => {
                assert_eq!(qname, "example.com");
                assert_eq!(message, b"\x12\x34");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_enable_round_trip() {
        let origin = Uuid::new_v4();
        let toggle = BlockingToggle {
            enabled: false,
            duration: Some(Duration::from_secs(300)),
            groups: vec![Arc::from("ads")],
        };
        let envelope = SyncEnvelope::enable(origin, &toggle);

        let parsed = SyncEnvelope::from_json(&envelope.to_json()).unwrap();
        match parsed.decode(Uuid::new_v4()) {
            Some(BrokerEvent::BlockingToggle(received)) => assert_eq!(received, toggle),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_own_origin_suppressed() {
        let origin = Uuid::new_v4();
        let envelope = SyncEnvelope::cache(origin, "example.com", b"x");
        assert!(envelope.decode(origin).is_none());
    }

    #[test]
    fn test_garbage_tolerated() {
        assert!(SyncEnvelope::from_json("not json").is_none());

        let envelope = SyncEnvelope {
            k: "example.com".into(),
            t: TYPE_CACHE,
            m: "!!! not base64 !!!".into(),
            c: Uuid::new_v4(),
        };
        assert!(envelope.decode(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_storage_key_round_trip() {
        let key = cache_key("example.com");
        assert_eq!(key, "cache:example.com");
        assert_eq!(qname_from_key(&key), Some("example.com"));
        assert_eq!(qname_from_key("other:example.com"), None);
    }
}
