//! Cache domain - entries, keys, capability model and the persistent tier contract

mod capability;
mod clock;
mod entry;
mod key;
mod store;

pub use capability::{CapabilityStatus, StoreOperation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{validate_ttl, CacheEntry};
pub use key::{validate_key, CacheKeyParams, HashedKeyGenerator, KeyNamespace, DEFAULT_NAMESPACE};
pub use store::{with_timeout, PersistentStore, StoreError, StoreErrorKind};

#[cfg(test)]
pub use store::mock::{MockOp, MockStore};
#[cfg(test)]
pub use store::MockPersistentStore;
