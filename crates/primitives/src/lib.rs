//! Collection primitives for Tessera
//!
//! Emulates mutable collection types on the ordered, transactional store:
//! - **SetStore**: sets of unique byte-string members, with set algebra
//! - **HashStore**: field → value maps
//! - **Keyspace operations**: type-agnostic delete, exists, type and expiry
//! - **GC**: bounded sweeps reclaiming detached and expired collection
//!   versions, and a background worker running them
//!
//! ## Layout
//!
//! Each collection is one meta record (id, type, cardinality, timestamps)
//! plus one data key per member under its current id. Overwriting or
//! deleting a collection never touches its data keys inline; it unlinks the
//! meta record and leaves a GC entry for the sweeper.
//!
//! ## Design Principle: Stateless Facades
//!
//! `SetStore` and `HashStore` hold only an `Arc<Database>` and run each call
//! in its own transaction. Multiple instances on the same Database are safe.
//!
//! ## Composing Operations
//!
//! Extension traits run several operations in one transaction:
//!
//! ```
//! use tessera_core::Keyspace;
//! use tessera_engine::Database;
//! use tessera_primitives::SetExt;
//!
//! let db = Database::in_memory();
//! let common = db
//!     .transaction(Keyspace::new("app", 0), |txn| {
//!         txn.set_add(b"a", &[b"1".to_vec(), b"2".to_vec()])?;
//!         txn.set_add(b"b", &[b"2".to_vec(), b"3".to_vec()])?;
//!         txn.set_inter(&[b"a".to_vec(), b"b".to_vec()])
//!     })
//!     .unwrap();
//! assert_eq!(common, vec![b"2".to_vec()]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod algebra;
pub mod cursor;
pub mod extensions;
pub mod gc;
pub mod hash;
mod keyspace;
pub mod meta;
pub mod set;

pub use cursor::SetCursor;
pub use gc::{expire_sweep, sweep, GcStats, GcWorker};
pub use hash::HashStore;
pub use meta::Meta;
pub use set::SetStore;

// Re-export extension traits for convenience
pub use extensions::*;
