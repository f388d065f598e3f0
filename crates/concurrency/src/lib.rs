//! Concurrency layer for Tessera
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: read/write/delete set tracking over a snapshot
//! - Cursor: ordered range iteration merging the snapshot with buffered writes
//! - Snapshot isolation with read-set validation at commit time
//! - TransactionManager: serialized commits, version allocation, and the
//!   registry of active snapshots used to pick a pruning safe point

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use cursor::Cursor;
pub use manager::TransactionManager;
pub use transaction::{ApplyResult, CommitError, TransactionContext, TransactionStatus};
pub use validation::{validate_read_set, ConflictType, ValidationResult};
