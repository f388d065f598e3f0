//! Storage layer for Tessera
//!
//! This crate implements the ordered, versioned byte-key store that the
//! transaction layer runs on:
//! - UnifiedStore: BTreeMap of version chains behind a RwLock
//! - VersionChain: newest-first MVCC history of one key, tombstones included
//! - StoreSnapshot: O(1) point-in-time view (Arc + version)
//! - Version pruning below a caller-supplied safe point
//!
//! Keys are raw bytes ordered lexicographically, so range scans over a
//! common prefix enumerate a contiguous, sorted run of entries.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;
pub mod stored_value;
pub mod unified;

pub use snapshot::StoreSnapshot;
pub use stored_value::{StoredValue, VersionChain};
pub use unified::{PruneStats, UnifiedStore};
