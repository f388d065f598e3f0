//! Core types for Tessera
//!
//! This module defines the foundational types:
//! - Keyspace: namespace + database id scoping all keys of a tenant database
//! - ObjectId: identifier of one version of a collection
//! - ObjectType: type discriminator stored in every meta record
//! - VersionedValue: a value as observed in a snapshot, with its commit version

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace + database pair forming a key-space prefix
///
/// Every physical key produced by [`crate::keys`] embeds the keyspace, so
/// two keyspaces never observe each other's collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Keyspace {
    /// Tenant namespace
    pub namespace: String,
    /// Database number within the namespace
    pub db: u32,
}

impl Keyspace {
    /// Create a new keyspace
    pub fn new(namespace: impl Into<String>, db: u32) -> Self {
        Self {
            namespace: namespace.into(),
            db,
        }
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new("default", 0)
    }
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.db)
    }
}

/// Version identifier of a collection
///
/// A fresh ObjectId is generated every time a collection is (re)created.
/// It is embedded as a fixed-width segment in every data key of that
/// version, so data ranges of different versions never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Encoded width in bytes
    pub const LEN: usize = 16;

    /// Create a new random ObjectId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an ObjectId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Create an ObjectId from a slice, if it is exactly 16 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 16] = bytes.try_into().ok()?;
        Some(Self::from_bytes(arr))
    }

    /// Get the raw bytes of this ObjectId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collection type discriminator
///
/// These values are part of the persisted meta record format and MUST NOT
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    /// Unordered set of unique byte-string members
    Set = 0x01,
    /// Field → value map
    Hash = 0x02,
}

impl ObjectType {
    /// Convert to byte representation
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Try to create from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(ObjectType::Set),
            0x02 => Some(ObjectType::Hash),
            _ => None,
        }
    }

    /// Lowercase type name, as reported by `TYPE`-style queries
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Set => "set",
            ObjectType::Hash => "hash",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value read from a snapshot together with the version that wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    /// Raw value bytes
    pub value: Vec<u8>,
    /// Commit version of the write that produced this value
    pub version: u64,
}

impl VersionedValue {
    /// Create a new versioned value
    pub fn new(value: Vec<u8>, version: u64) -> Self {
        Self { value, version }
    }
}
