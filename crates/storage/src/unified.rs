//! UnifiedStore: in-memory MVCC backend with BTreeMap and version chains
//!
//! This module implements the Storage trait using:
//! - `BTreeMap<Vec<u8>, VersionChain>` for ordered byte-key storage
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` tracking the highest applied commit version
//!
//! # Design Notes
//!
//! - **Version history**: every write and delete is kept until pruned, so
//!   snapshots read a stable state regardless of later commits
//! - **Batch atomicity**: a batch is applied under one write lock and the
//!   visible version is bumped before the lock is released
//! - **Pruning**: `prune(safe_point)` drops history older than the oldest
//!   snapshot the caller still needs

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use tessera_core::{Error, Result, Storage, VersionedValue};

use crate::snapshot::StoreSnapshot;
use crate::stored_value::{StoredValue, VersionChain};

/// Result of one pruning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Superseded versions and tombstones removed
    pub versions_removed: usize,
    /// Keys whose whole history was removed
    pub keys_removed: usize,
}

/// Unified storage backend using BTreeMap with RwLock
///
/// Thread-safe through `parking_lot::RwLock` and `AtomicU64`.
#[derive(Debug)]
pub struct UnifiedStore {
    /// Ordered map from physical key to its version history
    data: RwLock<BTreeMap<Vec<u8>, VersionChain>>,
    /// Highest commit version fully applied
    version: AtomicU64,
}

/// Half-open range bounds over byte keys; empty `end` is unbounded
fn range_bounds<'a>(start: &'a [u8], end: &'a [u8]) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end)
    };
    (Bound::Included(start), upper)
}

impl UnifiedStore {
    /// Create a new empty UnifiedStore
    ///
    /// Initial version is 0 (no writes have occurred).
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            version: AtomicU64::new(0),
        }
    }

    /// Create a snapshot of the current state
    ///
    /// O(1): the snapshot shares the store and filters by version on read.
    pub fn create_snapshot(self: &Arc<Self>) -> StoreSnapshot {
        StoreSnapshot::new(Arc::clone(self), self.current_version())
    }

    /// Drop history that no reader at or after `safe_point` can observe
    pub fn prune(&self, safe_point: u64) -> PruneStats {
        let mut stats = PruneStats::default();
        let mut data = self.data.write();
        data.retain(|_, chain| {
            stats.versions_removed += chain.gc(safe_point);
            if chain.is_empty() {
                stats.keys_removed += 1;
                false
            } else {
                true
            }
        });
        debug!(
            target: "tessera::storage",
            safe_point,
            versions_removed = stats.versions_removed,
            keys_removed = stats.keys_removed,
            "pruned version history"
        );
        stats
    }

    /// Count keys in `[start, end)` whose latest entry is live
    pub fn live_count_in(&self, start: &[u8], end: &[u8]) -> usize {
        if !end.is_empty() && start >= end {
            return 0;
        }
        let data = self.data.read();
        data.range::<[u8], _>(range_bounds(start, end))
            .filter(|(_, chain)| chain.latest().map_or(false, |sv| !sv.is_tombstone()))
            .count()
    }

    /// Total retained versions across all keys, tombstones included
    pub fn version_count(&self) -> usize {
        self.data.read().values().map(VersionChain::version_count).sum()
    }

    /// Number of keys with retained history
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }

    pub(crate) fn read_at(&self, key: &[u8], max_version: u64) -> Option<VersionedValue> {
        let data = self.data.read();
        data.get(key)
            .and_then(|chain| chain.live_at_version(max_version))
            .and_then(StoredValue::to_versioned)
    }

    pub(crate) fn scan_at(
        &self,
        start: &[u8],
        end: &[u8],
        max_version: u64,
        limit: usize,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        if limit == 0 || (!end.is_empty() && start >= end) {
            return Vec::new();
        }
        let data = self.data.read();
        data.range::<[u8], _>(range_bounds(start, end))
            .filter_map(|(k, chain)| {
                chain
                    .live_at_version(max_version)
                    .and_then(|sv| sv.value().map(|v| (k.clone(), v.to_vec())))
            })
            .take(limit)
            .collect()
    }
}

impl Default for UnifiedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for UnifiedStore {
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        Ok(self.read_at(key, u64::MAX))
    }

    fn get_versioned(&self, key: &[u8], max_version: u64) -> Result<Option<VersionedValue>> {
        Ok(self.read_at(key, max_version))
    }

    fn latest_version(&self, key: &[u8]) -> Result<u64> {
        let data = self.data.read();
        Ok(data
            .get(key)
            .and_then(VersionChain::latest)
            .map_or(0, StoredValue::version))
    }

    fn scan_versioned(
        &self,
        start: &[u8],
        end: &[u8],
        max_version: u64,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.scan_at(start, end, max_version, limit))
    }

    fn current_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn apply_batch(
        &self,
        writes: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
        version: u64,
    ) -> Result<()> {
        let mut data = self.data.write();
        let current = self.version.load(Ordering::Acquire);
        if version <= current {
            return Err(Error::storage(format!(
                "commit version {} is not newer than applied version {}",
                version, current
            )));
        }

        for (key, value) in writes {
            let sv = StoredValue::new(value.clone(), version);
            match data.get_mut(key.as_slice()) {
                Some(chain) => chain.push(sv),
                None => {
                    data.insert(key.clone(), VersionChain::new(sv));
                }
            }
        }
        for key in deletes {
            // Only record a tombstone where there is something to hide
            if let Some(chain) = data.get_mut(key.as_slice()) {
                if chain.latest().map_or(false, |sv| !sv.is_tombstone()) {
                    chain.push(StoredValue::tombstone(version));
                }
            }
        }

        self.version.store(version, Ordering::Release);
        Ok(())
    }
}
