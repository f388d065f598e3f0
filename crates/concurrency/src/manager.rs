//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating, under a single commit lock:
//! 1. Validation (first-committer-wins on the read set)
//! 2. Commit version allocation
//! 3. Storage application (visibility)
//!
//! It also keeps the registry of snapshots held by live transactions. The
//! oldest registered start version is the safe point below which version
//! history can be pruned.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. acquire commit lock
//! 2. txn.commit(store) - Active → Validating → Committed | Aborted
//! 3. IF read-only: return start_version (nothing to apply)
//! 4. allocate commit_version (increment global version)
//! 5. apply_writes() to storage at commit_version
//! 6. release commit lock, return commit_version
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use tessera_core::{SnapshotView, Storage};
use tessera_storage::UnifiedStore;

use crate::{CommitError, TransactionContext, TransactionStatus};

/// Manages transaction lifecycle and atomic commits
pub struct TransactionManager {
    /// Global version counter
    ///
    /// Monotonically increasing. Each committed write transaction increments by 1.
    version: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Serializes validate + apply
    commit_lock: Mutex<()>,

    /// Start versions held by live transactions, with reference counts
    active: Mutex<BTreeMap<u64, usize>>,
}

impl TransactionManager {
    /// Create a new transaction manager
    ///
    /// # Arguments
    /// * `initial_version` - Starting version (the store's current version)
    pub fn new(initial_version: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
            active: Mutex::new(BTreeMap::new()),
        }
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Allocate next commit version (increment global version)
    fn allocate_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Begin a transaction on a fresh snapshot of `store`
    ///
    /// The snapshot's version is registered as active until `release` is
    /// called with it. Taking the snapshot under the registry lock keeps it
    /// ordered with respect to `safe_point`.
    pub fn begin(&self, store: &Arc<UnifiedStore>) -> TransactionContext {
        let mut active = self.active.lock();
        let snapshot = store.create_snapshot();
        let start_version = snapshot.version();
        *active.entry(start_version).or_insert(0) += 1;
        drop(active);

        let txn_id = self.next_txn_id();
        debug!(target: "tessera::txn", txn_id, start_version, "transaction started");
        TransactionContext::new(txn_id, Box::new(snapshot))
    }

    /// Unregister a snapshot previously handed out by `begin`
    pub fn release(&self, start_version: u64) {
        let mut active = self.active.lock();
        if let Some(count) = active.get_mut(&start_version) {
            *count -= 1;
            if *count == 0 {
                active.remove(&start_version);
            }
        }
    }

    /// Oldest start version still held by a live transaction
    pub fn oldest_active_version(&self) -> Option<u64> {
        self.active.lock().keys().next().copied()
    }

    /// Number of live transactions
    pub fn active_count(&self) -> usize {
        self.active.lock().values().sum()
    }

    /// Highest version whose history no live transaction can need older
    /// entries of: the oldest active snapshot, or the store's current
    /// version when none are live.
    pub fn safe_point<S: Storage + ?Sized>(&self, store: &S) -> u64 {
        let active = self.active.lock();
        let current = store.current_version();
        active.keys().next().copied().map_or(current, |v| v.min(current))
    }

    /// Commit a transaction atomically
    ///
    /// # Returns
    /// - Ok(commit_version) on success; read-only transactions return their
    ///   start version without allocating a new one
    /// - Err(CommitError) if validation or storage application fails
    pub fn commit<S: Storage + ?Sized>(
        &self,
        txn: &mut TransactionContext,
        store: &S,
    ) -> std::result::Result<u64, CommitError> {
        let _guard = self.commit_lock.lock();

        txn.commit(store)?;

        if txn.is_read_only() {
            debug!(target: "tessera::txn", txn_id = txn.txn_id, "read-only transaction committed");
            return Ok(txn.start_version);
        }

        let commit_version = self.allocate_version();
        if let Err(e) = txn.apply_writes(store, commit_version) {
            error!(
                target: "tessera::txn",
                txn_id = txn.txn_id,
                commit_version,
                error = %e,
                "storage application failed"
            );
            txn.status = TransactionStatus::Aborted {
                reason: format!("storage application failed: {}", e),
            };
            return Err(CommitError::StorageError(e.to_string()));
        }

        debug!(
            target: "tessera::txn",
            txn_id = txn.txn_id,
            commit_version,
            writes = txn.write_count(),
            deletes = txn.delete_count(),
            "transaction committed"
        );
        Ok(commit_version)
    }

    /// Explicitly abort a transaction
    ///
    /// All buffered operations are discarded.
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) {
        let reason = reason.into();
        if txn.mark_aborted(reason.clone()).is_ok() {
            debug!(target: "tessera::txn", txn_id = txn.txn_id, %reason, "transaction aborted");
        }
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("version", &self.current_version())
            .field("active", &self.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<UnifiedStore>, TransactionManager) {
        let store = Arc::new(UnifiedStore::new());
        let manager = TransactionManager::new(store.current_version());
        (store, manager)
    }

    #[test]
    fn test_txn_ids_are_unique() {
        let (store, manager) = setup();
        let a = manager.begin(&store);
        let b = manager.begin(&store);
        assert_ne!(a.txn_id, b.txn_id);
    }

    #[test]
    fn test_commit_allocates_versions() {
        let (store, manager) = setup();
        let mut txn = manager.begin(&store);
        txn.put(b"k".to_vec(), b"v".to_vec()).unwrap();
        let v1 = manager.commit(&mut txn, store.as_ref()).unwrap();
        assert_eq!(v1, 1);
        assert_eq!(store.current_version(), 1);

        let mut txn = manager.begin(&store);
        txn.put(b"k".to_vec(), b"v2".to_vec()).unwrap();
        assert_eq!(manager.commit(&mut txn, store.as_ref()).unwrap(), 2);
    }

    #[test]
    fn test_read_only_commit_does_not_bump_version() {
        let (store, manager) = setup();
        let mut txn = manager.begin(&store);
        txn.get(b"k").unwrap();
        assert_eq!(manager.commit(&mut txn, store.as_ref()).unwrap(), 0);
        assert_eq!(manager.current_version(), 0);
    }

    #[test]
    fn test_first_committer_wins() {
        let (store, manager) = setup();
        let mut t1 = manager.begin(&store);
        let mut t2 = manager.begin(&store);
        t1.get(b"k").unwrap();
        t2.get(b"k").unwrap();
        t1.put(b"k".to_vec(), b"1".to_vec()).unwrap();
        t2.put(b"k".to_vec(), b"2".to_vec()).unwrap();

        assert!(manager.commit(&mut t1, store.as_ref()).is_ok());
        let err = manager.commit(&mut t2, store.as_ref()).unwrap_err();
        assert!(matches!(err, CommitError::ValidationFailed(_)));
        assert_eq!(store.get(b"k").unwrap().unwrap().value, b"1");
    }

    #[test]
    fn test_active_registry_and_safe_point() {
        let (store, manager) = setup();
        let mut writer = manager.begin(&store);
        writer.put(b"k".to_vec(), b"v".to_vec()).unwrap();

        let reader = manager.begin(&store);
        assert_eq!(manager.oldest_active_version(), Some(0));

        manager.commit(&mut writer, store.as_ref()).unwrap();
        manager.release(writer.start_version);
        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.safe_point(store.as_ref()), 0);

        manager.release(reader.start_version);
        assert_eq!(manager.oldest_active_version(), None);
        assert_eq!(manager.safe_point(store.as_ref()), 1);
    }

    #[test]
    fn test_abort_discards_writes() {
        let (store, manager) = setup();
        let mut txn = manager.begin(&store);
        txn.put(b"k".to_vec(), b"v".to_vec()).unwrap();
        manager.abort(&mut txn, "test");
        assert!(txn.is_aborted());
        assert!(manager.commit(&mut txn, store.as_ref()).is_err());
        assert!(store.get(b"k").unwrap().is_none());
    }
}
