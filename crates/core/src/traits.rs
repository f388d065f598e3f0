//! Core traits for storage and snapshot abstraction
//!
//! These traits are the seam between the collection layer and the ordered,
//! transactional key-value substrate. The substrate offers only point reads,
//! half-open byte-range scans, and atomic batch application at a commit
//! version; everything richer is built above it.
//!
//! Range bounds are half-open `[start, end)`. An empty `end` means the scan
//! is unbounded above.

use crate::error::Result;
use crate::types::VersionedValue;

/// Ordered byte-key storage with versioned writes
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait Storage: Send + Sync {
    /// Get the latest live value for a key
    ///
    /// Returns None if the key doesn't exist or its latest version is a
    /// tombstone.
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>>;

    /// Get the live value visible at `max_version`
    fn get_versioned(&self, key: &[u8], max_version: u64) -> Result<Option<VersionedValue>>;

    /// Commit version of the newest entry for a key, tombstones included
    ///
    /// Returns 0 if the key has no retained history. Used by commit-time
    /// validation to detect writes newer than a transaction's snapshot.
    fn latest_version(&self, key: &[u8]) -> Result<u64>;

    /// Scan live entries visible at `max_version` in `[start, end)`
    ///
    /// Returns at most `limit` entries in ascending key order.
    fn scan_versioned(
        &self,
        start: &[u8],
        end: &[u8],
        max_version: u64,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Get current global version
    ///
    /// Returns the highest commit version applied so far.
    fn current_version(&self) -> u64;

    /// Apply writes and deletes atomically at a single commit version
    ///
    /// No reader may observe a partial batch.
    fn apply_batch(
        &self,
        writes: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
        version: u64,
    ) -> Result<()>;
}

/// Read-only point-in-time view of storage
///
/// A snapshot never observes writes committed after it was taken.
pub trait SnapshotView: Send + Sync {
    /// Get the value visible in this snapshot
    fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>>;

    /// Scan up to `limit` live entries in `[start, end)`, ascending
    fn scan(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Version this snapshot was taken at
    fn version(&self) -> u64;
}
