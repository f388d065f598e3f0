//! Transaction context for OCC
//!
//! TransactionContext tracks all reads, writes and deletes for a
//! transaction, enabling validation at commit time.
//!
//! Reads come from a snapshot taken at `start_version` and are recorded in
//! the read set; writes and deletes are buffered and become visible to
//! other transactions only when the commit applies them atomically.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

use tessera_core::{Error, Result, SnapshotView, Storage};

use crate::cursor::Cursor;
use crate::validation::{validate_read_set, ValidationResult};

/// Error type for commit failures
#[derive(Debug, Clone)]
pub enum CommitError {
    /// Transaction aborted due to read-set conflicts
    ValidationFailed(ValidationResult),

    /// Transaction was not in correct state for commit
    ///
    /// Commit requires Active state to transition to Validating
    InvalidState(String),

    /// Storage failed while validating or applying the transaction
    StorageError(String),
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitError::ValidationFailed(result) => {
                write!(f, "Commit failed: {} conflict(s)", result.conflict_count())
            }
            CommitError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            CommitError::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CommitError {}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => Error::conflict(format!(
                "{} key(s) in the read set changed since the snapshot",
                result.conflict_count()
            )),
            CommitError::InvalidState(state) => Error::TransactionNotActive { state },
            CommitError::StorageError(message) => Error::Storage { message },
        }
    }
}

/// Summary of what `apply_writes` handed to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyResult {
    /// Commit version the batch was applied at
    pub commit_version: u64,
    /// Number of puts applied
    pub puts_applied: usize,
    /// Number of deletes applied
    pub deletes_applied: usize,
}

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (user abort or error)
///
/// Terminal states (no transitions allowed):
/// - `Committed`
/// - `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

impl TransactionStatus {
    fn name(&self) -> String {
        match self {
            TransactionStatus::Active => "active".to_string(),
            TransactionStatus::Validating => "validating".to_string(),
            TransactionStatus::Committed => "committed".to_string(),
            TransactionStatus::Aborted { reason } => format!("aborted ({})", reason),
        }
    }
}

/// Transaction context for OCC with snapshot isolation
///
/// # Read Semantics
///
/// 1. **write_set**: Returns uncommitted write from this transaction
/// 2. **delete_set**: Returns None for uncommitted delete
/// 3. **snapshot**: Returns value from snapshot, tracks in read_set
///
/// # Lifecycle
///
/// 1. **BEGIN**: Create with `new()`, status is `Active`
/// 2. **READ/WRITE**: Use `get()`, `batch_get()`, `scan()`, `put()`, `delete()`
/// 3. **VALIDATE**: `commit()` checks the read set against storage
/// 4. **APPLY**: `apply_writes()` hands the buffered batch to storage
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: u64,

    /// Version at transaction start (snapshot version)
    pub start_version: u64,

    snapshot: Box<dyn SnapshotView>,

    /// Keys read from the snapshot and the version observed (0 if absent)
    pub read_set: HashMap<Vec<u8>, u64>,

    /// Buffered writes, ordered so cursors can merge them
    pub write_set: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Buffered deletes
    pub delete_set: BTreeSet<Vec<u8>>,

    /// Current transaction status
    pub status: TransactionStatus,

    start_time: Instant,
}

impl TransactionContext {
    /// Create a new transaction reading from `snapshot`
    pub fn new(txn_id: u64, snapshot: Box<dyn SnapshotView>) -> Self {
        let start_version = snapshot.version();
        TransactionContext {
            txn_id,
            start_version,
            snapshot,
            read_set: HashMap::new(),
            write_set: BTreeMap::new(),
            delete_set: BTreeSet::new(),
            status: TransactionStatus::Active,
            start_time: Instant::now(),
        }
    }

    // === Read Operations ===

    /// Get a value from the transaction
    ///
    /// Own writes and deletes are returned without a read-set entry; reads
    /// from the snapshot record the observed version.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_active()?;

        if let Some(value) = self.write_set.get(key) {
            return Ok(Some(value.clone()));
        }
        if self.delete_set.contains(key) {
            return Ok(None);
        }

        let found = self.snapshot.get(key)?;
        let version = found.as_ref().map_or(0, |vv| vv.version);
        self.read_set.insert(key.to_vec(), version);
        Ok(found.map(|vv| vv.value))
    }

    /// Get several keys in one call, results in request order
    pub fn batch_get(&mut self, keys: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Check existence of a key (tracked like `get`)
    pub fn exists(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Open a cursor over `[start, end)`; empty `end` is unbounded
    ///
    /// The cursor sees this transaction's buffered writes and deletes.
    /// Range reads are not recorded in the read set.
    pub fn scan(&self, start: &[u8], end: &[u8], batch_size: usize) -> Result<Cursor<'_>> {
        self.ensure_active()?;
        Cursor::open(
            self.snapshot.as_ref(),
            &self.write_set,
            &self.delete_set,
            start,
            end,
            batch_size,
        )
    }

    // === Write Operations ===

    /// Buffer a write
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.ensure_active()?;
        self.delete_set.remove(&key);
        self.write_set.insert(key, value);
        Ok(())
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.ensure_active()?;
        self.write_set.remove(&key);
        self.delete_set.insert(key);
        Ok(())
    }

    // === State ===

    /// Check if transaction is active
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Check if transaction aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Time since the transaction began
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Return an error unless the transaction is active
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::TransactionNotActive {
                state: self.status.name(),
            })
        }
    }

    /// Transition `Active` → `Validating`
    pub fn mark_validating(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::Validating;
        Ok(())
    }

    /// Transition `Validating` → `Committed`
    pub fn mark_committed(&mut self) -> Result<()> {
        match self.status {
            TransactionStatus::Validating => {
                self.status = TransactionStatus::Committed;
                Ok(())
            }
            _ => Err(Error::TransactionNotActive {
                state: self.status.name(),
            }),
        }
    }

    /// Transition to `Aborted` from any non-terminal state
    ///
    /// Buffered operations are discarded.
    pub fn mark_aborted(&mut self, reason: impl Into<String>) -> Result<()> {
        match self.status {
            TransactionStatus::Committed | TransactionStatus::Aborted { .. } => {
                Err(Error::TransactionNotActive {
                    state: self.status.name(),
                })
            }
            _ => {
                self.write_set.clear();
                self.delete_set.clear();
                self.status = TransactionStatus::Aborted {
                    reason: reason.into(),
                };
                Ok(())
            }
        }
    }

    // === Commit ===

    /// Validate the read set and mark the transaction committed
    ///
    /// Read-only transactions skip validation.
    /// Does not touch storage contents; the caller applies the buffered
    /// batch with `apply_writes` under its commit serialization.
    pub fn commit<S: Storage + ?Sized>(&mut self, store: &S) -> std::result::Result<(), CommitError> {
        self.mark_validating()
            .map_err(|e| CommitError::InvalidState(e.to_string()))?;

        // A read-only transaction serializes at its snapshot
        if self.is_read_only() {
            self.status = TransactionStatus::Committed;
            return Ok(());
        }

        let result = match validate_read_set(&self.read_set, self.start_version, store) {
            Ok(result) => result,
            Err(e) => {
                self.status = TransactionStatus::Aborted {
                    reason: format!("validation failed: {}", e),
                };
                return Err(CommitError::StorageError(e.to_string()));
            }
        };

        if !result.is_valid() {
            self.status = TransactionStatus::Aborted {
                reason: format!("{} read-write conflict(s)", result.conflict_count()),
            };
            return Err(CommitError::ValidationFailed(result));
        }

        self.status = TransactionStatus::Committed;
        Ok(())
    }

    /// Apply the buffered batch to storage at `commit_version`
    pub fn apply_writes<S: Storage + ?Sized>(
        &self,
        store: &S,
        commit_version: u64,
    ) -> Result<ApplyResult> {
        if !self.is_committed() {
            return Err(Error::TransactionNotActive {
                state: self.status.name(),
            });
        }
        let writes: Vec<(Vec<u8>, Vec<u8>)> = self
            .write_set
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let deletes: Vec<Vec<u8>> = self.delete_set.iter().cloned().collect();
        store.apply_batch(&writes, &deletes, commit_version)?;
        Ok(ApplyResult {
            commit_version,
            puts_applied: writes.len(),
            deletes_applied: deletes.len(),
        })
    }

    // === Introspection ===

    /// Number of keys read from the snapshot
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of buffered writes
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Number of buffered deletes
    pub fn delete_count(&self) -> usize {
        self.delete_set.len()
    }

    /// True if nothing would be written at commit
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty() && self.delete_set.is_empty()
    }

    /// Reason for abort, if aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("status", &self.status)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .field("deletes", &self.delete_set.len())
            .finish()
    }
}
