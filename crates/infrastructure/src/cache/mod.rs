pub mod expiring;
pub mod key;

pub use expiring::{CachedResponse, ExpiringCache, ReloadFn};
pub use key::CacheKey;
