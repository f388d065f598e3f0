//! Core types and traits for Tessera
//!
//! This crate defines the foundational pieces shared by every layer:
//! - Keyspace: namespace + database pair scoping every physical key
//! - ObjectId: per-version collection identifier (UUID v4)
//! - ObjectType: collection type discriminator (Set, Hash)
//! - keys: order-preserving physical key encoding (meta, data, GC entries)
//! - key: user key validation and size limits
//! - Error: error taxonomy (store, type, argument, corruption)
//! - Traits: Storage and SnapshotView, the seam to the ordered KV substrate

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod keys;
pub mod timestamp;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use key::{validate_key, validate_key_with_limits, validate_keyspace, Limits};
pub use timestamp::Timestamp;
pub use traits::{SnapshotView, Storage};
pub use types::{Keyspace, ObjectId, ObjectType, VersionedValue};
