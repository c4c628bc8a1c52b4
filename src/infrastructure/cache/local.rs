//! In-process cache tier using moka

use chrono::{DateTime, Utc};
use moka::ops::compute::Op;
use moka::sync::Cache as MokaCache;

use crate::domain::cache::CacheEntry;

/// Configuration for the local tier
#[derive(Debug, Clone, Default)]
pub struct LocalTierConfig {
    /// Maximum number of entries; `None` keeps every entry until it expires or is cleared
    pub max_entries: Option<u64>,
}

impl LocalTierConfig {
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

/// Process-local store of serialized entries.
///
/// Keys are used exactly as given (no namespace). Expiry is judged against the
/// `now` handed in by the caller, and an expired entry is removed by the read
/// that finds it.
#[derive(Debug, Clone)]
pub struct LocalTier {
    entries: MokaCache<String, CacheEntry<String>>,
}

impl Default for LocalTier {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTier {
    pub fn new() -> Self {
        Self::with_config(LocalTierConfig::default())
    }

    pub fn with_config(config: LocalTierConfig) -> Self {
        let entries = match config.max_entries {
            Some(max) => MokaCache::builder().max_capacity(max).build(),
            None => MokaCache::builder().build(),
        };

        Self { entries }
    }

    /// Returns the live entry for `key`, dropping it if it has expired
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<String>> {
        let entry = self.entries.get(key)?;

        if entry.is_expired(now) {
            self.evict_expired(key, now);
            return None;
        }

        Some(entry)
    }

    /// Removes the entry under `key` only if the one stored right now is expired,
    /// so a concurrent `set` between the read and the removal survives
    fn evict_expired(&self, key: &str, now: DateTime<Utc>) {
        self.entries
            .entry_by_ref(key)
            .and_compute_with(|current| match current {
                Some(current) if current.value().is_expired(now) => Op::Remove,
                _ => Op::Nop,
            });
    }

    /// Stores an entry, replacing any previous one
    pub fn set(&self, key: &str, entry: CacheEntry<String>) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn has(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.get(key, now).is_some()
    }

    /// Removes an entry, returning whether a live one was present
    pub fn delete(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    pub fn clear(&self) {
        let keys: Vec<String> = self.entries.iter().map(|(k, _)| k.as_ref().clone()).collect();

        for key in keys {
            self.entries.invalidate(&key);
        }

        self.entries.run_pending_tasks();
    }

    /// Number of stored entries, including expired ones not yet discovered
    pub fn size(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }
}
