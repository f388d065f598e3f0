//! Tessera - mutable collection types on an ordered transactional store
//!
//! Tessera stores sets and hashes as contiguous, sorted ranges of physical
//! keys in a snapshot-isolated key-value store, keeps their cardinality in
//! a per-collection meta record, evaluates set algebra as streaming merges
//! over sorted cursors, and reclaims deleted collections with a bounded
//! background garbage collector.
//!
//! # Quick Start
//!
//! ```
//! use tessera::{Database, Keyspace, SetStore};
//!
//! let db = Database::in_memory();
//! let sets = SetStore::new(db);
//! let ks = Keyspace::new("app", 0);
//!
//! sets.add(&ks, b"a", &[b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]).unwrap();
//! sets.add(&ks, b"b", &[b"2".to_vec(), b"3".to_vec(), b"4".to_vec()]).unwrap();
//!
//! let both = sets.inter(&ks, &[b"a".to_vec(), b"b".to_vec()]).unwrap();
//! assert_eq!(both, vec![b"2".to_vec(), b"3".to_vec()]);
//! ```
//!
//! # Architecture
//!
//! - `tessera-core`: errors, identifiers, key encoding, storage traits
//! - `tessera-storage`: in-memory ordered MVCC store
//! - `tessera-concurrency`: optimistic transactions and range cursors
//! - `tessera-engine`: `Database`, `Transaction`, configuration
//! - `tessera-primitives`: sets, hashes, set algebra, GC

pub use tessera_core::{keys, Error, Keyspace, ObjectId, ObjectType, Result, Timestamp};
pub use tessera_engine::{Database, GcConfig, RetryConfig, TesseraConfig, Transaction};
pub use tessera_primitives::{
    expire_sweep, sweep, GcStats, GcWorker, HashExt, HashStore, KeyspaceExt, Meta, SetCursor,
    SetExt, SetStore,
};
