//! Cache infrastructure - local tier, Redis tier, capability probing and the tiered cache

mod factory;
mod local;
mod prober;
mod redis;
mod tiered;

pub use factory::{CacheConfig, CacheFactory};
pub use local::{LocalTier, LocalTierConfig};
pub use prober::{CapabilityProber, ProberConfig};
pub use self::redis::{classify_redis_error, redact_url, RedisStore, RedisStoreConfig};
pub use tiered::{ClearOutcome, MemoryOnlyReason, TieredCache, TieredCacheConfig};
