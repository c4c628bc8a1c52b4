//! Builds the tiered cache from configuration

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::cache::{KeyNamespace, PersistentStore, DEFAULT_NAMESPACE};
use crate::domain::DomainError;

use super::local::LocalTierConfig;
use super::redis::{redact_url, RedisStore, RedisStoreConfig};
use super::tiered::{TieredCache, TieredCacheConfig};

/// Cache settings as they come from the application configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL; no URL means a memory-only cache
    pub redis_url: Option<String>,
    pub namespace: String,
    pub default_ttl: Duration,
    pub local_backfill_ttl: Duration,
    pub probe_interval: Duration,
    pub operation_timeout: Duration,
    pub connection_timeout: Duration,
    pub local_max_entries: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl: Duration::from_secs(3600),
            local_backfill_ttl: Duration::from_secs(3600),
            probe_interval: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(3),
            connection_timeout: Duration::from_secs(5),
            local_max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn memory_only() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_local_max_entries(mut self, max_entries: u64) -> Self {
        self.local_max_entries = Some(max_entries);
        self
    }

    /// Checks values that would make the cache misbehave
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.namespace.trim().is_empty() {
            return Err(DomainError::configuration("Cache namespace must not be empty"));
        }

        for (name, value) in [
            ("default_ttl", self.default_ttl),
            ("local_backfill_ttl", self.local_backfill_ttl),
            ("probe_interval", self.probe_interval),
            ("operation_timeout", self.operation_timeout),
        ] {
            if value.is_zero() {
                return Err(DomainError::configuration(format!(
                    "Cache {} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn tiered_config(&self) -> TieredCacheConfig {
        TieredCacheConfig {
            namespace: KeyNamespace::new(self.namespace.clone()),
            default_ttl: self.default_ttl,
            local_backfill_ttl: self.local_backfill_ttl,
            operation_timeout: self.operation_timeout,
            probe_interval: self.probe_interval,
            local: LocalTierConfig {
                max_entries: self.local_max_entries,
            },
        }
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a tiered cache.
    ///
    /// A Redis that cannot be reached at startup is kept as the persistent tier
    /// and reconnected by later probes; only an invalid configuration is an error.
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<TieredCache>, DomainError> {
        config.validate()?;

        let store: Option<Arc<dyn PersistentStore>> = match &config.redis_url {
            None => {
                info!("No Redis URL configured, cache is memory-only");
                None
            }
            Some(url) => {
                let redis_config = RedisStoreConfig::new(url.clone())
                    .with_connection_timeout(config.connection_timeout);

                let store = RedisStore::new(redis_config)?;

                match store.warm_up().await {
                    Ok(()) => {
                        info!(url = %redact_url(url), namespace = %config.namespace, "Connected persistent cache");
                    }
                    Err(e) => {
                        warn!(url = %redact_url(url), error = %e, "Persistent cache unreachable at startup, serving from memory until a probe succeeds");
                    }
                }

                Some(Arc::new(store) as Arc<dyn PersistentStore>)
            }
        };

        Ok(Arc::new(TieredCache::new(store, config.tiered_config())))
    }

    /// Creates a memory-only cache
    pub fn create_memory_only(&self, config: &CacheConfig) -> Arc<TieredCache> {
        Arc::new(TieredCache::memory_only(config.tiered_config()))
    }
}
