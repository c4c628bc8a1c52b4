//! Two-tier cache: a process-local accelerator in front of an optional shared store

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::cache::{
    validate_key, validate_ttl, with_timeout, CacheEntry, CapabilityStatus, Clock, KeyNamespace,
    PersistentStore, StoreError, StoreOperation, SystemClock,
};
use crate::domain::DomainError;

use super::local::{LocalTier, LocalTierConfig};
use super::prober::{CapabilityProber, ProberConfig};

/// Settings for [`TieredCache`]
#[derive(Debug, Clone)]
pub struct TieredCacheConfig {
    /// Namespace prepended to every persistent key
    pub namespace: KeyNamespace,
    /// TTL used by `set` when the caller does not pass one
    pub default_ttl: Duration,
    /// Lifetime given to local copies of values found in the persistent tier
    pub local_backfill_ttl: Duration,
    /// Ceiling applied to every persistent call
    pub operation_timeout: Duration,
    pub probe_interval: Duration,
    pub local: LocalTierConfig,
}

impl Default for TieredCacheConfig {
    fn default() -> Self {
        Self {
            namespace: KeyNamespace::default(),
            default_ttl: Duration::from_secs(3600),
            local_backfill_ttl: Duration::from_secs(3600),
            operation_timeout: Duration::from_secs(3),
            probe_interval: Duration::from_secs(60),
            local: LocalTierConfig::default(),
        }
    }
}

impl TieredCacheConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = KeyNamespace::new(namespace);
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_local_backfill_ttl(mut self, ttl: Duration) -> Self {
        self.local_backfill_ttl = ttl;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_local_max_entries(mut self, max_entries: u64) -> Self {
        self.local = self.local.with_max_entries(max_entries);
        self
    }
}

/// What a `clear` call actually reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ClearOutcome {
    /// Local tier cleared and matching persistent keys deleted
    Full { persistent_deleted: usize },
    /// Only the local tier was cleared
    MemoryOnly { reason: MemoryOnlyReason },
}

impl ClearOutcome {
    pub fn is_full(&self) -> bool {
        matches!(self, ClearOutcome::Full { .. })
    }
}

/// Why a clear stopped at the local tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOnlyReason {
    NoPersistentStore,
    Unavailable,
    ReadOnly,
    KeysCommandDenied,
    PersistentError,
}

/// Tiered cache with automatic degradation.
///
/// Reads go local first, then to the persistent tier when it is readable.
/// Writes always land locally and reach the persistent tier only while it is
/// writable. Persistent faults are logged, folded into the capability status
/// and otherwise swallowed: the only errors returned are input errors.
pub struct TieredCache {
    local: LocalTier,
    persistent: Option<Persistent>,
    clock: Arc<dyn Clock>,
    config: TieredCacheConfig,
}

struct Persistent {
    store: Arc<dyn PersistentStore>,
    prober: CapabilityProber,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("local_entries", &self.local.size())
            .field("persistent", &self.persistent.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl TieredCache {
    /// Cache with no persistent tier
    pub fn memory_only(config: TieredCacheConfig) -> Self {
        Self::build(None, Arc::new(SystemClock), config)
    }

    pub fn new(store: Option<Arc<dyn PersistentStore>>, config: TieredCacheConfig) -> Self {
        Self::build(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Option<Arc<dyn PersistentStore>>,
        clock: Arc<dyn Clock>,
        config: TieredCacheConfig,
    ) -> Self {
        Self::build(store, clock, config)
    }

    fn build(
        store: Option<Arc<dyn PersistentStore>>,
        clock: Arc<dyn Clock>,
        config: TieredCacheConfig,
    ) -> Self {
        let persistent = store.map(|store| {
            let prober = CapabilityProber::new(
                store.clone(),
                config.namespace.clone(),
                clock.clone(),
                ProberConfig {
                    probe_interval: config.probe_interval,
                    operation_timeout: config.operation_timeout,
                    ..ProberConfig::default()
                },
            );
            Persistent { store, prober }
        });

        Self {
            local: LocalTier::with_config(config.local.clone()),
            persistent,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &TieredCacheConfig {
        &self.config
    }

    pub fn has_persistent_tier(&self) -> bool {
        self.persistent.is_some()
    }

    /// Reads a value, local tier first
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomainError> {
        validate_key(key)?;
        let now = self.clock.now();

        if let Some(entry) = self.local.get(key, now) {
            match serde_json::from_str(&entry.data) {
                Ok(value) => {
                    debug!(key, tier = "local", "Cache hit");
                    return Ok(Some(value));
                }
                Err(e) => {
                    warn!(key, error = %e, "Dropping undecodable local cache entry");
                    self.local.delete(key, now);
                }
            }
        }

        let Some(persistent) = &self.persistent else {
            return Ok(None);
        };

        if !persistent.prober.status().await.can_read() {
            return Ok(None);
        }

        let stored_key = self.config.namespace.apply(key);
        let raw = match self
            .guarded(persistent, StoreOperation::Read, persistent.store.get(&stored_key))
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(key, error = %e, "Persistent cache read failed, treating as miss");
                return Ok(None);
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                debug!(key, tier = "persistent", "Cache hit");
                self.backfill(key, raw);
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key, error = %e, "Undecodable persistent cache entry, treating as miss");
                self.drop_poisoned(persistent, &stored_key).await;
                Ok(None)
            }
        }
    }

    /// Writes a value with the default TTL
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DomainError> {
        self.set_with_ttl(key, value, self.config.default_ttl).await
    }

    /// Writes a value locally, then to the persistent tier when it is writable.
    ///
    /// Succeeds once the local write is done; a skipped or failed persistent
    /// write only shows up in the logs and in [`TieredCache::status`].
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        validate_key(key)?;
        validate_ttl(ttl)?;

        let data = serde_json::to_string(value).map_err(|e| {
            DomainError::validation(format!("Cache value for '{}' is not serializable: {}", key, e))
        })?;

        let entry = CacheEntry::new(data, self.clock.now(), ttl)?;
        self.local.set(key, entry.clone());

        let Some(persistent) = &self.persistent else {
            return Ok(());
        };

        if !persistent.prober.status().await.can_write() {
            debug!(key, "Persistent cache not writable, value kept locally");
            return Ok(());
        }

        let stored_key = self.config.namespace.apply(key);
        if let Err(e) = self
            .guarded(
                persistent,
                StoreOperation::Write,
                persistent.store.set_ex(&stored_key, &entry.data, ttl),
            )
            .await
        {
            warn!(key, error = %e, "Persistent cache write failed, value kept locally");
        }

        Ok(())
    }

    /// Returns true when either tier holds a live value for `key`
    pub async fn has(&self, key: &str) -> Result<bool, DomainError> {
        validate_key(key)?;

        if self.local.has(key, self.clock.now()) {
            return Ok(true);
        }

        let Some(persistent) = &self.persistent else {
            return Ok(false);
        };

        if !persistent.prober.status().await.can_read() {
            return Ok(false);
        }

        let stored_key = self.config.namespace.apply(key);
        match self
            .guarded(persistent, StoreOperation::Read, persistent.store.exists(&stored_key))
            .await
        {
            Ok(exists) => Ok(exists),
            Err(e) => {
                warn!(key, error = %e, "Persistent cache existence check failed");
                Ok(false)
            }
        }
    }

    /// Removes `key` from both tiers; the local removal alone counts as success
    pub async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        validate_key(key)?;

        let removed_locally = self.local.delete(key, self.clock.now());

        let Some(persistent) = &self.persistent else {
            return Ok(removed_locally);
        };

        if !persistent.prober.status().await.can_write() {
            return Ok(removed_locally);
        }

        let stored_key = self.config.namespace.apply(key);
        match self
            .guarded(persistent, StoreOperation::Delete, persistent.store.delete(&stored_key))
            .await
        {
            Ok(removed) => Ok(removed_locally || removed),
            Err(e) => {
                warn!(key, error = %e, "Persistent cache delete failed");
                Ok(removed_locally)
            }
        }
    }

    /// Clears the whole local tier, then persistent keys matching `pattern` when allowed.
    ///
    /// The pattern only applies to the persistent tier, where it is matched
    /// under the namespace (`None` means every key).
    pub async fn clear(&self, pattern: Option<&str>) -> ClearOutcome {
        self.local.clear();

        let Some(persistent) = &self.persistent else {
            return ClearOutcome::MemoryOnly {
                reason: MemoryOnlyReason::NoPersistentStore,
            };
        };

        let status = persistent.prober.status().await;
        if let Some(reason) = Self::memory_only_reason(&status) {
            debug!(?reason, "Persistent cache not cleared");
            return ClearOutcome::MemoryOnly { reason };
        }

        let stored_pattern = self.config.namespace.pattern(pattern);
        let keys = match self
            .guarded(persistent, StoreOperation::Keys, persistent.store.keys(&stored_pattern))
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %stored_pattern, error = %e, "Persistent cache key enumeration failed");
                return ClearOutcome::MemoryOnly {
                    reason: Self::failure_reason(&e),
                };
            }
        };

        let keys: Vec<String> = keys
            .into_iter()
            .filter(|k| !self.config.namespace.is_sentinel(k))
            .collect();

        match self
            .guarded(persistent, StoreOperation::Delete, persistent.store.delete_many(&keys))
            .await
        {
            Ok(deleted) => ClearOutcome::Full {
                persistent_deleted: deleted,
            },
            Err(e) => {
                warn!(pattern = %stored_pattern, error = %e, "Persistent cache bulk delete failed");
                ClearOutcome::MemoryOnly {
                    reason: Self::failure_reason(&e),
                }
            }
        }
    }

    /// Capability flags only, as cached by the prober; issues no enumeration
    pub async fn capability(&self) -> CapabilityStatus {
        match &self.persistent {
            Some(persistent) => persistent.prober.status().await,
            None => CapabilityStatus::unavailable(),
        }
    }

    /// Current capability plus live counts from both tiers.
    ///
    /// The persistent count is fetched fresh on every call.
    pub async fn status(&self) -> CapabilityStatus {
        let memory_keys = self.local.size();

        let Some(persistent) = &self.persistent else {
            return CapabilityStatus::unavailable().with_counts(memory_keys, 0);
        };

        let status = persistent.prober.status().await;
        if !(status.available && status.keys_command_allowed) {
            return status.with_counts(memory_keys, 0);
        }

        let pattern = self.config.namespace.pattern(None);
        let keys_count = match self
            .guarded(persistent, StoreOperation::Keys, persistent.store.keys(&pattern))
            .await
        {
            Ok(keys) => keys
                .iter()
                .filter(|k| !self.config.namespace.is_sentinel(k))
                .count(),
            Err(e) => {
                warn!(error = %e, "Persistent cache key count failed");
                0
            }
        };

        // A failed count may have downgraded the status.
        persistent
            .prober
            .last_known()
            .await
            .with_counts(memory_keys, keys_count)
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// Errors from `compute` propagate and nothing is stored.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        if let Some(cached) = self.get(key).await? {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set_with_ttl(key, &value, ttl).await?;
        Ok(value)
    }

    fn backfill(&self, key: &str, raw: String) {
        match CacheEntry::new(raw, self.clock.now(), self.config.local_backfill_ttl) {
            Ok(entry) => self.local.set(key, entry),
            Err(e) => warn!(key, error = %e, "Skipping local backfill"),
        }
    }

    async fn drop_poisoned(&self, persistent: &Persistent, stored_key: &str) {
        if !persistent.prober.last_known().await.can_write() {
            return;
        }

        if let Err(e) = self
            .guarded(persistent, StoreOperation::Delete, persistent.store.delete(stored_key))
            .await
        {
            warn!(key = stored_key, error = %e, "Failed to delete undecodable persistent entry");
        }
    }

    /// Runs a persistent call under the timeout and feeds any failure to the prober
    async fn guarded<T, F>(
        &self,
        persistent: &Persistent,
        operation: StoreOperation,
        call: F,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let result = with_timeout(self.config.operation_timeout, call).await;

        if let Err(e) = &result {
            persistent.prober.record_failure(operation, e.kind).await;
        }

        result
    }

    fn memory_only_reason(status: &CapabilityStatus) -> Option<MemoryOnlyReason> {
        if !status.available {
            Some(MemoryOnlyReason::Unavailable)
        } else if status.read_only {
            Some(MemoryOnlyReason::ReadOnly)
        } else if !status.keys_command_allowed {
            Some(MemoryOnlyReason::KeysCommandDenied)
        } else {
            None
        }
    }

    fn failure_reason(error: &StoreError) -> MemoryOnlyReason {
        if error.is_connectivity() {
            MemoryOnlyReason::Unavailable
        } else {
            MemoryOnlyReason::PersistentError
        }
    }
}
