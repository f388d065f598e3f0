//! StoreSnapshot: version-bounded view over a shared UnifiedStore
//!
//! Creation is O(1): the snapshot holds an `Arc` to the live store and the
//! commit version current at creation. Reads filter each key's version
//! chain to that version, so later commits stay invisible for as long as
//! the history is not pruned past it.

use std::sync::Arc;

use tessera_core::{Result, SnapshotView, VersionedValue};

use crate::unified::UnifiedStore;

/// Point-in-time view of a UnifiedStore
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tessera_core::{SnapshotView, Storage};
/// use tessera_storage::UnifiedStore;
///
/// let store = Arc::new(UnifiedStore::new());
/// store.apply_batch(&[(b"k".to_vec(), b"v1".to_vec())], &[], 1).unwrap();
/// let snapshot = store.create_snapshot();
///
/// store.apply_batch(&[(b"k".to_vec(), b"v2".to_vec())], &[], 2).unwrap();
/// assert_eq!(snapshot.get(b"k").unwrap().unwrap().value, b"v1");
/// ```
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    store: Arc<UnifiedStore>,
    version: u64,
}

impl StoreSnapshot {
    /// Create a view of `store` at `version`
    ///
    /// Typically called through `UnifiedStore::create_snapshot()`.
    pub fn new(store: Arc<UnifiedStore>, version: u64) -> Self {
        Self { store, version }
    }
}

impl SnapshotView for StoreSnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        Ok(self.store.read_at(key, self.version))
    }

    fn scan(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.store.scan_at(start, end, self.version, limit))
    }

    fn version(&self) -> u64 {
        self.version
    }
}
