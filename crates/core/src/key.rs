//! User key validation
//!
//! Collection names and keyspace namespaces are validated before any store
//! access, so malformed input surfaces as `InvalidArgument` rather than as
//! a store error.
//!
//! Rules:
//! - Keys must not be empty
//! - Keys must not exceed `max_key_bytes` (default: 1024)
//! - Namespaces must not be empty and must fit a `u16` length prefix

use crate::error::{Error, Result};
use crate::types::Keyspace;
use serde::{Deserialize, Serialize};

/// Size limits for keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum user key length in bytes (default: 1024)
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
}

fn default_max_key_bytes() -> usize {
    1024
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_key_bytes: default_max_key_bytes(),
        }
    }
}

/// Validate a user key using default limits
///
/// # Examples
///
/// ```
/// use tessera_core::key::validate_key;
///
/// assert!(validate_key(b"myset").is_ok());
/// assert!(validate_key(b"").is_err());
/// ```
pub fn validate_key(key: &[u8]) -> Result<()> {
    validate_key_with_limits(key, &Limits::default())
}

/// Validate a user key with custom limits
pub fn validate_key_with_limits(key: &[u8], limits: &Limits) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_argument("key cannot be empty"));
    }
    if key.len() > limits.max_key_bytes {
        return Err(Error::invalid_argument(format!(
            "key too long: {} bytes exceeds maximum {}",
            key.len(),
            limits.max_key_bytes
        )));
    }
    Ok(())
}

/// Validate a keyspace before it is used to build physical keys
pub fn validate_keyspace(ks: &Keyspace) -> Result<()> {
    if ks.namespace.is_empty() {
        return Err(Error::invalid_argument("namespace cannot be empty"));
    }
    if ks.namespace.len() > u16::MAX as usize {
        return Err(Error::invalid_argument(format!(
            "namespace too long: {} bytes exceeds maximum {}",
            ks.namespace.len(),
            u16::MAX
        )));
    }
    Ok(())
}
