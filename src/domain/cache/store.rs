//! Persistent tier contract

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Closed classification of persistent tier failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The store rejected the command for this client (ACL, read-only replica, disabled command)
    Permission,
    /// The store could not be reached in time
    Connectivity,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreErrorKind::Permission => write!(f, "permission"),
            StoreErrorKind::Connectivity => write!(f, "connectivity"),
            StoreErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

const PERMISSION_MARKERS: &[&str] = &[
    "noperm",
    "readonly",
    "read only",
    "read-only",
    "permission",
    "not allowed",
    "unknown command",
    "noauth",
    "wrongpass",
    "unauthorized",
    "denied",
];

const CONNECTIVITY_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "connection refused",
    "connection reset",
    "broken pipe",
    "reset by peer",
    "not connected",
    "unreachable",
    "dns",
    "failed to lookup",
    "eof",
];

impl StoreErrorKind {
    /// Classifies by message text, for transports that expose no structured code
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();

        if PERMISSION_MARKERS.iter().any(|m| lower.contains(m)) {
            StoreErrorKind::Permission
        } else if CONNECTIVITY_MARKERS.iter().any(|m| lower.contains(m)) {
            StoreErrorKind::Connectivity
        } else {
            StoreErrorKind::Unknown
        }
    }
}

/// Error returned by a persistent tier client
#[derive(Debug, Clone, Error)]
#[error("{kind} store error: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Permission, message)
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connectivity, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unknown, message)
    }

    pub fn is_permission(&self) -> bool {
        self.kind == StoreErrorKind::Permission
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind == StoreErrorKind::Connectivity
    }
}

/// Network key-value store used as the shared, persistent tier.
///
/// Keys arrive fully namespaced; values are opaque text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Reads a value; a missing key is `Ok(None)`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value with the store's native expiry
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes many keys, returning how many existed
    async fn delete_many(&self, keys: &[String]) -> Result<usize, StoreError>;

    /// Enumerates keys matching a glob pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}

/// Bounds a persistent tier call; running out of time counts as a connectivity failure
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::connectivity(format!(
            "operation timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Store command recorded by [`MockStore`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum MockOp {
        Get,
        SetEx,
        Exists,
        Delete,
        DeleteMany,
        Keys,
    }

    /// In-memory store double with per-command failure injection and call counting
    #[derive(Debug, Default)]
    pub struct MockStore {
        entries: Mutex<HashMap<String, (String, Duration)>>,
        failures: Mutex<HashMap<MockOp, StoreError>>,
        calls: Mutex<HashMap<MockOp, usize>>,
        delay: Mutex<Option<Duration>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entry(self, key: &str, value: &str) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), Duration::from_secs(60)));
            self
        }

        pub fn failing(self, op: MockOp, error: StoreError) -> Self {
            self.fail(op, error);
            self
        }

        pub fn with_delay(self, delay: Duration) -> Self {
            *self.delay.lock().unwrap() = Some(delay);
            self
        }

        /// Makes every command fail from now on
        pub fn fail_all(&self, error: StoreError) {
            for op in [
                MockOp::Get,
                MockOp::SetEx,
                MockOp::Exists,
                MockOp::Delete,
                MockOp::DeleteMany,
                MockOp::Keys,
            ] {
                self.fail(op, error.clone());
            }
        }

        pub fn fail(&self, op: MockOp, error: StoreError) {
            self.failures.lock().unwrap().insert(op, error);
        }

        pub fn recover(&self) {
            self.failures.lock().unwrap().clear();
        }

        pub fn calls(&self, op: MockOp) -> usize {
            self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
        }

        pub fn raw(&self, key: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .get(key)
                .map(|(v, _)| v.clone())
        }

        pub fn ttl_of(&self, key: &str) -> Option<Duration> {
            self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        async fn enter(&self, op: MockOp) -> Result<(), StoreError> {
            *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            match self.failures.lock().unwrap().get(&op) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn matcher(pattern: &str) -> regex::Regex {
            let escaped = regex::escape(pattern).replace(r"\*", ".*");
            regex::Regex::new(&format!("^{}$", escaped)).unwrap()
        }
    }

    #[async_trait]
    impl PersistentStore for MockStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.enter(MockOp::Get).await?;
            Ok(self.raw(key))
        }

        async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            self.enter(MockOp::SetEx).await?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl));
            Ok(())
        }

        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            self.enter(MockOp::Exists).await?;
            Ok(self.entries.lock().unwrap().contains_key(key))
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.enter(MockOp::Delete).await?;
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }

        async fn delete_many(&self, keys: &[String]) -> Result<usize, StoreError> {
            self.enter(MockOp::DeleteMany).await?;
            let mut entries = self.entries.lock().unwrap();
            Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count())
        }

        async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
            self.enter(MockOp::Keys).await?;
            let matcher = Self::matcher(pattern);
            let mut keys: Vec<String> = self
                .entries
                .lock()
                .unwrap()
                .keys()
                .filter(|k| matcher.is_match(k))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        }
    }
}
