//! Persistent tier capability model

use serde::{Deserialize, Serialize};

use super::store::StoreErrorKind;

/// Class of persistent tier command, used when folding an observed failure into the status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    /// Point reads and existence checks
    Read,
    /// Point writes
    Write,
    /// Point and bulk deletes
    Delete,
    /// Pattern enumeration (KEYS)
    Keys,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOperation::Read => write!(f, "read"),
            StoreOperation::Write => write!(f, "write"),
            StoreOperation::Delete => write!(f, "delete"),
            StoreOperation::Keys => write!(f, "keys"),
        }
    }
}

/// Snapshot of what the persistent tier currently allows
///
/// `available == false` always comes with `read_only == true` and both command
/// flags cleared. The constructors and transitions below are the only way the
/// cache produces new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStatus {
    pub available: bool,
    pub read_only: bool,
    pub keys_command_allowed: bool,
    pub get_command_allowed: bool,
    /// Live persistent key count, filled by status queries when KEYS is allowed
    pub keys_count: usize,
    /// Live local tier size, filled by status queries
    pub memory_keys_count: usize,
}

impl Default for CapabilityStatus {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl CapabilityStatus {
    /// A store that grants nothing
    pub fn unavailable() -> Self {
        Self {
            available: false,
            read_only: true,
            keys_command_allowed: false,
            get_command_allowed: false,
            keys_count: 0,
            memory_keys_count: 0,
        }
    }

    /// A reachable store with the given permissions
    pub fn reachable(read_only: bool, keys_command_allowed: bool) -> Self {
        Self {
            available: true,
            read_only,
            keys_command_allowed,
            get_command_allowed: true,
            keys_count: 0,
            memory_keys_count: 0,
        }
    }

    pub fn can_read(&self) -> bool {
        self.available && self.get_command_allowed
    }

    pub fn can_write(&self) -> bool {
        self.available && !self.read_only
    }

    /// Bulk clear needs both enumeration and write access
    pub fn can_bulk_clear(&self) -> bool {
        self.can_write() && self.keys_command_allowed
    }

    /// Downgrades the status after a failure observed outside a scheduled probe.
    ///
    /// Transitions only ever remove capability; the next probe is what grants it back.
    pub fn after_failure(self, operation: StoreOperation, kind: StoreErrorKind) -> Self {
        match (kind, operation) {
            (StoreErrorKind::Connectivity, _) => Self::unavailable().with_counts_of(&self),
            (StoreErrorKind::Permission, StoreOperation::Read) => {
                Self::unavailable().with_counts_of(&self)
            }
            (StoreErrorKind::Permission, StoreOperation::Write | StoreOperation::Delete) => Self {
                read_only: true,
                ..self
            },
            (StoreErrorKind::Permission, StoreOperation::Keys) => Self {
                keys_command_allowed: false,
                ..self
            },
            (StoreErrorKind::Unknown, _) => self,
        }
    }

    /// Attaches live counts to a probe result
    pub fn with_counts(self, memory_keys_count: usize, keys_count: usize) -> Self {
        Self {
            memory_keys_count,
            keys_count,
            ..self
        }
    }

    fn with_counts_of(self, other: &Self) -> Self {
        self.with_counts(other.memory_keys_count, other.keys_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> CapabilityStatus {
        CapabilityStatus::reachable(false, true)
    }

    #[test]
    fn test_unavailable_grants_nothing() {
        let status = CapabilityStatus::unavailable();

        assert!(!status.available);
        assert!(status.read_only);
        assert!(!status.keys_command_allowed);
        assert!(!status.get_command_allowed);
        assert!(!status.can_read());
        assert!(!status.can_write());
    }

    #[test]
    fn test_connectivity_failure_makes_unavailable() {
        let status = full().after_failure(StoreOperation::Write, StoreErrorKind::Connectivity);
        assert_eq!(status, CapabilityStatus::unavailable());
    }

    #[test]
    fn test_write_permission_failure_makes_read_only() {
        let status = full().after_failure(StoreOperation::Write, StoreErrorKind::Permission);

        assert!(status.available);
        assert!(status.read_only);
        assert!(status.can_read());
        assert!(status.keys_command_allowed);
    }

    #[test]
    fn test_read_permission_failure_makes_unavailable() {
        let status = full().after_failure(StoreOperation::Read, StoreErrorKind::Permission);
        assert!(!status.available);
        assert!(!status.get_command_allowed);
    }

    #[test]
    fn test_keys_permission_failure_only_clears_keys_flag() {
        let status = full().after_failure(StoreOperation::Keys, StoreErrorKind::Permission);

        assert!(!status.keys_command_allowed);
        assert!(status.can_write());
        assert!(!status.can_bulk_clear());
    }

    #[test]
    fn test_unknown_failure_keeps_status() {
        let status = full().after_failure(StoreOperation::Write, StoreErrorKind::Unknown);
        assert_eq!(status, full());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&full().with_counts(3, 7)).unwrap();

        assert!(json.contains("\"readOnly\":false"));
        assert!(json.contains("\"keysCommandAllowed\":true"));
        assert!(json.contains("\"getCommandAllowed\":true"));
        assert!(json.contains("\"keysCount\":7"));
        assert!(json.contains("\"memoryKeysCount\":3"));
    }
}
