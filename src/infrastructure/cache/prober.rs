//! Capability probing for the persistent tier

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::cache::{
    with_timeout, CapabilityStatus, Clock, KeyNamespace, PersistentStore, StoreErrorKind,
    StoreOperation,
};

/// Probe scheduling and sentinel settings
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Minimum time between two probes
    pub probe_interval: Duration,
    /// Ceiling applied to every probe command
    pub operation_timeout: Duration,
    /// TTL of the write sentinel, in case the delete after it never lands
    pub sentinel_ttl: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(3),
            sentinel_ttl: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct ProbeState {
    status: CapabilityStatus,
    last_probe: Option<DateTime<Utc>>,
}

/// Learns what the persistent tier allows, re-probing at most once per interval
pub struct CapabilityProber {
    store: Arc<dyn PersistentStore>,
    namespace: KeyNamespace,
    clock: Arc<dyn Clock>,
    config: ProberConfig,
    state: Mutex<ProbeState>,
}

impl std::fmt::Debug for CapabilityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProber")
            .field("namespace", &self.namespace)
            .field("config", &self.config)
            .finish()
    }
}

impl CapabilityProber {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        namespace: KeyNamespace,
        clock: Arc<dyn Clock>,
        config: ProberConfig,
    ) -> Self {
        Self {
            store,
            namespace,
            clock,
            config,
            state: Mutex::new(ProbeState {
                status: CapabilityStatus::unavailable(),
                last_probe: None,
            }),
        }
    }

    /// Returns the current status, probing first when the last result is stale.
    ///
    /// Concurrent callers wait on the same probe instead of issuing their own.
    pub async fn status(&self) -> CapabilityStatus {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if let Some(last) = state.last_probe {
            // A clock that moved backwards counts as stale
            let fresh = (now - last)
                .to_std()
                .map(|elapsed| elapsed < self.config.probe_interval)
                .unwrap_or(false);

            if fresh {
                return state.status;
            }
        }

        let probed = self.probe().await;

        if probed != state.status {
            info!(
                available = probed.available,
                read_only = probed.read_only,
                keys_allowed = probed.keys_command_allowed,
                get_allowed = probed.get_command_allowed,
                "Persistent cache capability changed"
            );
        } else {
            debug!(available = probed.available, "Persistent cache capability unchanged");
        }

        state.status = probed;
        state.last_probe = Some(now);
        probed
    }

    /// Last known status without probing
    pub async fn last_known(&self) -> CapabilityStatus {
        self.state.lock().await.status
    }

    /// Folds a failure seen during normal operation into the status without waiting for a probe
    pub async fn record_failure(&self, operation: StoreOperation, kind: StoreErrorKind) {
        let mut state = self.state.lock().await;
        let downgraded = state.status.after_failure(operation, kind);

        if downgraded != state.status {
            warn!(
                operation = %operation,
                error_kind = %kind,
                available = downgraded.available,
                read_only = downgraded.read_only,
                "Downgrading persistent cache capability"
            );
            state.status = downgraded;
        }
    }

    /// Forces the next `status` call to probe
    pub async fn invalidate(&self) {
        self.state.lock().await.last_probe = None;
    }

    async fn probe(&self) -> CapabilityStatus {
        let limit = self.config.operation_timeout;

        let read_sentinel = self.namespace.read_sentinel();
        if let Err(e) = with_timeout(limit, self.store.get(&read_sentinel)).await {
            match e.kind {
                StoreErrorKind::Connectivity => {
                    warn!(error = %e, "Persistent cache unreachable");
                }
                StoreErrorKind::Permission => {
                    warn!(error = %e, "Persistent cache denies reads, treating it as unavailable");
                }
                StoreErrorKind::Unknown => {
                    warn!(error = %e, "Persistent cache read probe failed");
                }
            }
            return CapabilityStatus::unavailable();
        }

        let keys_allowed =
            match with_timeout(limit, self.store.keys(&self.namespace.sentinel_pattern())).await {
                Ok(_) => true,
                Err(e) if e.is_permission() => {
                    info!(error = %e, "Persistent cache denies KEYS");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "Persistent cache KEYS probe failed");
                    false
                }
            };

        let read_only = !self.probe_write(limit).await;

        CapabilityStatus::reachable(read_only, keys_allowed)
    }

    async fn probe_write(&self, limit: Duration) -> bool {
        let sentinel = self.namespace.write_sentinel();
        let stamp = self.clock.now().timestamp_millis().to_string();

        let written = with_timeout(
            limit,
            self.store.set_ex(&sentinel, &stamp, self.config.sentinel_ttl),
        )
        .await;

        if let Err(e) = written {
            if e.is_permission() {
                info!(error = %e, "Persistent cache is read-only");
            } else {
                warn!(error = %e, "Persistent cache write probe failed, assuming read-only");
            }
            return false;
        }

        match with_timeout(limit, self.store.delete(&sentinel)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Persistent cache delete probe failed, assuming read-only");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{ManualClock, MockOp, MockPersistentStore, MockStore, StoreError};

    fn prober_for(store: Arc<MockStore>, clock: Arc<ManualClock>) -> CapabilityProber {
        CapabilityProber::new(
            store,
            KeyNamespace::new("test"),
            clock,
            ProberConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_full_access() {
        let store = Arc::new(MockStore::new());
        let prober = prober_for(store.clone(), Arc::new(ManualClock::default()));

        let status = prober.status().await;

        assert_eq!(status, CapabilityStatus::reachable(false, true));
        assert_eq!(store.calls(MockOp::Get), 1);
        assert_eq!(store.calls(MockOp::Keys), 1);
        assert_eq!(store.calls(MockOp::SetEx), 1);
        assert_eq!(store.calls(MockOp::Delete), 1);
        assert!(store.raw("test:__probe:write").is_none());
    }

    #[tokio::test]
    async fn test_result_cached_within_interval() {
        let store = Arc::new(MockStore::new());
        let clock = Arc::new(ManualClock::default());
        let prober = prober_for(store.clone(), clock.clone());

        prober.status().await;
        clock.advance(Duration::from_secs(30));
        prober.status().await;
        assert_eq!(store.calls(MockOp::Get), 1);

        clock.advance(Duration::from_secs(31));
        prober.status().await;
        assert_eq!(store.calls(MockOp::Get), 2);
    }

    #[tokio::test]
    async fn test_clock_moving_backwards_reprobes() {
        let store = Arc::new(MockStore::new());
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let prober = prober_for(store.clone(), clock.clone());

        assert!(prober.status().await.available);
        store.fail_all(StoreError::connectivity("connection refused"));

        clock.set(start - chrono::Duration::hours(1));

        assert!(!prober.status().await.available);
        assert_eq!(store.calls(MockOp::Get), 2);
    }

    #[tokio::test]
    async fn test_stale_status_returned_between_probes() {
        let store = Arc::new(MockStore::new());
        let clock = Arc::new(ManualClock::default());
        let prober = prober_for(store.clone(), clock.clone());

        assert!(prober.status().await.available);

        store.fail_all(StoreError::connectivity("connection refused"));
        clock.advance(Duration::from_secs(10));
        assert!(prober.status().await.available);

        clock.advance(Duration::from_secs(60));
        assert!(!prober.status().await.available);
    }

    #[tokio::test]
    async fn test_unreachable_skips_remaining_probes() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::Get, StoreError::connectivity("connection refused")),
        );
        let prober = prober_for(store.clone(), Arc::new(ManualClock::default()));

        let status = prober.status().await;

        assert_eq!(status, CapabilityStatus::unavailable());
        assert_eq!(store.calls(MockOp::Keys), 0);
        assert_eq!(store.calls(MockOp::SetEx), 0);
    }

    #[tokio::test]
    async fn test_read_permission_denied_is_unavailable() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::Get, StoreError::permission("NOPERM get")),
        );
        let prober = prober_for(store.clone(), Arc::new(ManualClock::default()));

        let status = prober.status().await;

        assert!(!status.available);
        assert!(!status.get_command_allowed);
        assert!(status.read_only);
    }

    #[tokio::test]
    async fn test_keys_denied() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::Keys, StoreError::permission("NOPERM keys")),
        );
        let prober = prober_for(store, Arc::new(ManualClock::default()));

        let status = prober.status().await;

        assert!(status.available);
        assert!(!status.keys_command_allowed);
        assert!(!status.read_only);
    }

    #[tokio::test]
    async fn test_keys_unknown_failure_treated_as_denied() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::Keys, StoreError::unknown("weird reply")),
        );
        let prober = prober_for(store, Arc::new(ManualClock::default()));

        assert!(!prober.status().await.keys_command_allowed);
    }

    #[tokio::test]
    async fn test_read_only_replica() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::SetEx, StoreError::permission("READONLY replica")),
        );
        let prober = prober_for(store.clone(), Arc::new(ManualClock::default()));

        let status = prober.status().await;

        assert!(status.available);
        assert!(status.get_command_allowed);
        assert!(status.read_only);
        assert_eq!(store.calls(MockOp::Delete), 0);
    }

    #[tokio::test]
    async fn test_unknown_write_failure_fails_closed() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::SetEx, StoreError::unknown("OOM command not allowed")),
        );
        let prober = prober_for(store, Arc::new(ManualClock::default()));

        assert!(prober.status().await.read_only);
    }

    #[tokio::test]
    async fn test_failed_sentinel_delete_fails_closed() {
        let store = Arc::new(
            MockStore::new().failing(MockOp::Delete, StoreError::permission("NOPERM del")),
        );
        let prober = prober_for(store, Arc::new(ManualClock::default()));

        assert!(prober.status().await.read_only);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_counts_as_unreachable() {
        let store = Arc::new(MockStore::new().with_delay(Duration::from_secs(30)));
        let prober = prober_for(store, Arc::new(ManualClock::default()));

        assert_eq!(prober.status().await, CapabilityStatus::unavailable());
    }

    #[tokio::test]
    async fn test_record_failure_downgrades_immediately() {
        let store = Arc::new(MockStore::new());
        let prober = prober_for(store.clone(), Arc::new(ManualClock::default()));

        prober.status().await;
        prober
            .record_failure(StoreOperation::Write, StoreErrorKind::Permission)
            .await;

        let status = prober.status().await;
        assert!(status.read_only);
        assert!(status.available);
        assert_eq!(store.calls(MockOp::Get), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_probe() {
        let store = Arc::new(MockStore::new());
        let prober = prober_for(store.clone(), Arc::new(ManualClock::default()));

        prober.status().await;
        prober.invalidate().await;
        prober.status().await;

        assert_eq!(store.calls(MockOp::Get), 2);
    }

    #[tokio::test]
    async fn test_probe_uses_namespaced_sentinels() {
        let mut store = MockPersistentStore::new();
        store
            .expect_get()
            .withf(|key| key == "test:__probe:read")
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_keys()
            .withf(|pattern| pattern == "test:__probe:*")
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_set_ex()
            .withf(|key, _, ttl| key == "test:__probe:write" && *ttl == Duration::from_secs(10))
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_delete()
            .withf(|key| key == "test:__probe:write")
            .times(1)
            .returning(|_| Ok(true));

        let prober = CapabilityProber::new(
            Arc::new(store),
            KeyNamespace::new("test"),
            Arc::new(ManualClock::default()),
            ProberConfig::default(),
        );

        assert_eq!(prober.status().await, CapabilityStatus::reachable(false, true));
    }
}
