//! Transaction validation for OCC
//!
//! Rules:
//! - First-committer-wins based on READ-SET, not write-set
//! - Blind writes (write without read) do NOT conflict
//! - A read conflicts when the key gained any entry (write or delete)
//!   after the transaction's start version
//! - Range reads through a cursor are not tracked; callers that need
//!   protection read a guarding key (collection metadata) first

use std::collections::HashMap;

use tessera_core::{Result, Storage};

/// Types of conflicts that can occur during transaction validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// Read-write conflict: a key in the read set was written after the
    /// transaction's snapshot was taken
    ReadWriteConflict {
        /// The key that has a conflict
        key: Vec<u8>,
        /// Version observed when read (0 if absent)
        read_version: u64,
        /// Newest committed version at validation time
        current_version: u64,
    },
}

/// Result of transaction validation
///
/// Accumulates all conflicts found during validation.
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Validate the read-set against current storage state
///
/// For each key read from the snapshot, the newest committed entry must not
/// be newer than `start_version`.
pub fn validate_read_set<S: Storage + ?Sized>(
    read_set: &HashMap<Vec<u8>, u64>,
    start_version: u64,
    store: &S,
) -> Result<ValidationResult> {
    let mut result = ValidationResult::ok();

    for (key, read_version) in read_set {
        let current_version = store.latest_version(key)?;
        if current_version > start_version {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                key: key.clone(),
                read_version: *read_version,
                current_version,
            });
        }
    }

    Ok(result)
}
