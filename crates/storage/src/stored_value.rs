//! Versioned storage entries
//!
//! A key's history is a `VersionChain` of `StoredValue`s, newest first.
//! Deletes are recorded as tombstones (`value == None`) so snapshots taken
//! before the delete keep seeing the old value.

use std::collections::VecDeque;

use tessera_core::VersionedValue;

/// One version of a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    /// Value bytes, or None for a tombstone
    value: Option<Vec<u8>>,
    /// Commit version that wrote this entry
    version: u64,
}

impl StoredValue {
    /// Create a live value
    pub fn new(value: Vec<u8>, version: u64) -> Self {
        StoredValue {
            value: Some(value),
            version,
        }
    }

    /// Create a tombstone
    pub fn tombstone(version: u64) -> Self {
        StoredValue {
            value: None,
            version,
        }
    }

    /// Get the value, None for tombstones
    #[inline]
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Get the commit version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check if this entry records a delete
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Convert a live entry into the contract type
    pub fn to_versioned(&self) -> Option<VersionedValue> {
        self.value
            .as_ref()
            .map(|v| VersionedValue::new(v.clone(), self.version))
    }
}

/// Version chain for MVCC - stores multiple versions of a value
///
/// Versions are stored in descending order (newest first) for efficient
/// snapshot reads - we typically want the most recent version <= snapshot_version.
#[derive(Debug, Clone)]
pub struct VersionChain {
    /// VecDeque provides O(1) push_front for new versions
    versions: VecDeque<StoredValue>,
}

impl VersionChain {
    /// Create a new version chain with a single version
    pub fn new(value: StoredValue) -> Self {
        let mut versions = VecDeque::with_capacity(2);
        versions.push_front(value);
        Self { versions }
    }

    /// Add a new version (must be newer than existing versions)
    #[inline]
    pub fn push(&mut self, value: StoredValue) {
        debug_assert!(
            self.versions
                .front()
                .map_or(true, |front| front.version() <= value.version()),
            "versions must be pushed in commit order"
        );
        self.versions.push_front(value);
    }

    /// Get the entry at or before the given max_version, tombstones included
    pub fn get_at_version(&self, max_version: u64) -> Option<&StoredValue> {
        self.versions.iter().find(|sv| sv.version() <= max_version)
    }

    /// Get the live value at or before the given max_version
    pub fn live_at_version(&self, max_version: u64) -> Option<&StoredValue> {
        self.get_at_version(max_version)
            .filter(|sv| !sv.is_tombstone())
    }

    /// Get the latest version
    #[inline]
    pub fn latest(&self) -> Option<&StoredValue> {
        self.versions.front()
    }

    /// Drop history no snapshot at or after `safe_point` can observe
    ///
    /// Keeps the newest entry at or below `safe_point` (it is what such
    /// snapshots read) unless it is a tombstone, in which case it is
    /// indistinguishable from absence and dropped too. Returns the number
    /// of entries removed.
    pub fn gc(&mut self, safe_point: u64) -> usize {
        let before = self.versions.len();
        if let Some(idx) = self
            .versions
            .iter()
            .position(|sv| sv.version() <= safe_point)
        {
            self.versions.truncate(idx + 1);
            if self.versions.back().map_or(false, |sv| sv.is_tombstone()) {
                self.versions.pop_back();
            }
        }
        before - self.versions.len()
    }

    /// Number of versions stored
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Check if the version chain is empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
