pub mod envelope;
pub mod redis;

pub use envelope::{cache_key, qname_from_key, SyncEnvelope, SYNC_CHANNEL};
pub use redis::RedisBroker;
