//! Error types for Tessera
//!
//! Errors fall into four classes that callers handle differently:
//!
//! - **Store errors** (`Conflict`, `Storage`, `TransactionNotActive`): the
//!   transactional substrate failed. Propagated unchanged, never retried
//!   inside the collection layer.
//! - **Type errors** (`WrongType`): a key holds a collection of another type.
//! - **Argument errors** (`InvalidArgument`): malformed input, reported before
//!   any store access.
//! - **Corruption**: a persisted record could not be decoded.
//!
//! Absence is not an error anywhere in this crate family.

use crate::types::ObjectType;
use thiserror::Error;

/// Result type alias for Tessera operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Tessera
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Commit-time conflict: another transaction committed a write to a key
    /// this transaction read
    #[error("Transaction conflict: {reason}")]
    Conflict {
        /// Human-readable description of the conflict
        reason: String,
    },

    /// The underlying store reported a failure
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },

    /// Operation attempted on a committed or aborted transaction
    #[error("Transaction not active: {state}")]
    TransactionNotActive {
        /// State the transaction was in
        state: String,
    },

    /// Key holds a collection of a different type
    #[error("WRONGTYPE key {key:?} holds a {actual} value, expected {expected}")]
    WrongType {
        /// User key (lossy UTF-8)
        key: String,
        /// Type the operation required
        expected: ObjectType,
        /// Type actually stored
        actual: ObjectType,
    },

    /// Malformed operator input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A persisted record failed to decode
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        Error::Conflict {
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a wrong type error for a user key
    pub fn wrong_type(key: &[u8], expected: ObjectType, actual: ObjectType) -> Self {
        Error::WrongType {
            key: String::from_utf8_lossy(key).into_owned(),
            expected,
            actual,
        }
    }

    /// Create a corruption error
    pub fn corruption(message: impl Into<String>) -> Self {
        Error::Corruption(message.into())
    }

    /// True for failures originating in the transactional store
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Error::Conflict { .. } | Error::Storage { .. } | Error::TransactionNotActive { .. }
        )
    }

    /// True if the failure is a commit conflict a caller may retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// True for type mismatches
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Error::WrongType { .. })
    }

    /// True for malformed input
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
