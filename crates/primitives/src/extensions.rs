//! Transaction extension traits for composing collection operations
//!
//! ## Design Principle
//!
//! Extension traits let several collection operations share one
//! caller-managed transaction. Each trait is implemented for
//! `tessera_engine::Transaction` in the module that owns the logic, and the
//! stateless facades (`SetStore`, `HashStore`) call the same functions, so
//! both paths behave identically.
//!
//! ## Usage
//!
//! ```
//! use tessera_core::Keyspace;
//! use tessera_engine::Database;
//! use tessera_primitives::{HashExt, KeyspaceExt, SetExt};
//!
//! let db = Database::in_memory();
//! db.transaction(Keyspace::new("app", 0), |txn| {
//!     txn.set_add(b"tags", &[b"red".to_vec(), b"blue".to_vec()])?;
//!     txn.hash_set(b"user:1", b"name", b"ada".to_vec())?;
//!     assert_eq!(txn.key_exists(&[b"tags".to_vec(), b"user:1".to_vec()])?, 2);
//!     Ok(())
//! })
//! .unwrap();
//! ```
//!
//! Members, fields and key lists are owned byte strings; keys are user key
//! names (not physical keys).

use tessera_core::{ObjectType, Result, Timestamp};

use crate::cursor::SetCursor;

/// Set operations within a transaction
///
/// Implemented in `set.rs` and `algebra.rs`.
pub trait SetExt {
    /// Add members; returns how many were not already present
    fn set_add(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64>;

    /// All members in ascending byte order; empty if the set is absent
    fn set_members(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Cardinality from the meta record
    fn set_card(&mut self, key: &[u8]) -> Result<u64>;

    /// Membership test
    fn set_is_member(&mut self, key: &[u8], member: &[u8]) -> Result<bool>;

    /// Remove members; returns how many were present
    fn set_remove(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64>;

    /// Remove and return up to `count` members, smallest first
    ///
    /// Selection is ascending byte order from the start of the set, not
    /// uniformly random. `count <= 0` removes nothing.
    fn set_pop(&mut self, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>>;

    /// Move `member` from `src` to `dst`; true if it was in `src`
    fn set_move(&mut self, src: &[u8], dst: &[u8], member: &[u8]) -> Result<bool>;

    /// Sorted cursor over a set's members, `None` if the set is absent
    fn set_scan(&mut self, key: &[u8]) -> Result<Option<SetCursor<'_>>>;

    /// Union of all operands, ascending
    fn set_union(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>>;

    /// Intersection of all operands, ascending
    fn set_inter(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>>;

    /// First operand minus all others, ascending
    fn set_diff(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>>;

    /// Store the union in `dst`; returns its cardinality
    fn set_union_store(&mut self, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64>;

    /// Store the intersection in `dst`; returns its cardinality
    fn set_inter_store(&mut self, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64>;

    /// Store the difference in `dst`; returns its cardinality
    fn set_diff_store(&mut self, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64>;
}

/// Hash operations within a transaction
///
/// Implemented in `hash.rs`.
pub trait HashExt {
    /// Set a field; true if the field is new
    fn hash_set(&mut self, key: &[u8], field: &[u8], value: Vec<u8>) -> Result<bool>;

    /// Read a field
    fn hash_get(&mut self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete fields; returns how many were present
    fn hash_del(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<u64>;

    /// Number of fields
    fn hash_len(&mut self, key: &[u8]) -> Result<u64>;

    /// Field existence
    fn hash_exists(&mut self, key: &[u8], field: &[u8]) -> Result<bool>;

    /// All field/value pairs in ascending field order
    fn hash_get_all(&mut self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Type-agnostic key operations within a transaction
///
/// Implemented in `keyspace.rs`.
pub trait KeyspaceExt {
    /// Delete whole collections; returns how many existed
    fn key_delete(&mut self, keys: &[Vec<u8>]) -> Result<u64>;

    /// Count of keys that exist; repeated keys count repeatedly
    fn key_exists(&mut self, keys: &[Vec<u8>]) -> Result<u64>;

    /// Type of the collection at `key`
    fn key_type(&mut self, key: &[u8]) -> Result<Option<ObjectType>>;

    /// Set an absolute expiration; a time in the past deletes the key
    fn key_expire_at(&mut self, key: &[u8], at: Timestamp) -> Result<bool>;

    /// Remove the expiration; true if one was set
    fn key_persist(&mut self, key: &[u8]) -> Result<bool>;

    /// Remaining time to live in milliseconds; -2 if absent, -1 if no expiry
    fn key_ttl_ms(&mut self, key: &[u8]) -> Result<i64>;
}
