//! Expiring cache entries

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A value together with the instant it was stored and the instant it expires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Creates an entry that lives for `ttl` starting at `now`.
    ///
    /// A zero TTL is rejected: an entry must outlive the instant it was created.
    pub fn new(data: T, now: DateTime<Utc>, ttl: Duration) -> Result<Self, DomainError> {
        let ttl = validate_ttl(ttl)?;

        Ok(Self {
            data,
            created_at: now,
            expires_at: now + ttl,
        })
    }

    /// Returns true while `now` has not passed the expiry instant
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_live(now)
    }

    /// Time left before expiry, or `None` once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok()
    }
}

/// Validates a TTL and converts it to a chrono duration
pub fn validate_ttl(ttl: Duration) -> Result<chrono::Duration, DomainError> {
    if ttl.is_zero() {
        return Err(DomainError::validation("Cache TTL must be greater than zero"));
    }

    chrono::Duration::from_std(ttl)
        .map_err(|_| DomainError::validation(format!("Cache TTL {:?} is out of range", ttl)))
}
