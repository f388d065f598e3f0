//! Transaction coordinator for managing transaction lifecycle
//!
//! The TransactionCoordinator wraps TransactionManager and adds:
//! - Transaction metrics (started, committed, aborted)
//! - Conversion of commit failures into `tessera_core::Error`
//! - Logging of commit outcomes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tessera_concurrency::{TransactionContext, TransactionManager};
use tessera_core::{Error, Result, Storage};
use tessera_storage::UnifiedStore;
use tracing::{debug, warn};

/// Transaction coordinator for the database
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are observational only
/// and do not synchronize any other memory operations.
pub struct TransactionCoordinator {
    manager: TransactionManager,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
}

impl TransactionCoordinator {
    /// Create new coordinator with initial version
    pub fn new(initial_version: u64) -> Self {
        Self {
            manager: TransactionManager::new(initial_version),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
        }
    }

    /// Start a new transaction on a snapshot of `storage`
    pub fn start_transaction(&self, storage: &Arc<UnifiedStore>) -> TransactionContext {
        self.total_started.fetch_add(1, Ordering::Relaxed);
        self.manager.begin(storage)
    }

    /// Commit a transaction through the concurrency layer
    ///
    /// Records the outcome and releases the transaction's snapshot either way.
    pub fn commit<S: Storage + ?Sized>(&self, txn: &mut TransactionContext, store: &S) -> Result<u64> {
        let outcome = self.manager.commit(txn, store);
        self.manager.release(txn.start_version);
        match outcome {
            Ok(version) => {
                self.total_committed.fetch_add(1, Ordering::Relaxed);
                Ok(version)
            }
            Err(e) => {
                self.total_aborted.fetch_add(1, Ordering::Relaxed);
                warn!(target: "tessera::txn", txn_id = txn.txn_id, error = %e, "Transaction aborted");
                Err(Error::from(e))
            }
        }
    }

    /// Abort a transaction and release its snapshot
    pub fn abort(&self, txn: &mut TransactionContext, reason: &str) {
        self.manager.abort(txn, reason);
        self.manager.release(txn.start_version);
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
        debug!(target: "tessera::txn", txn_id = txn.txn_id, reason, "Transaction rolled back");
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Version below which no live transaction needs history
    pub fn safe_point<S: Storage + ?Sized>(&self, store: &S) -> u64 {
        self.manager.safe_point(store)
    }

    /// Get transaction metrics
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.manager.active_count() as u64,
            total_started: started,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Transaction metrics
#[derive(Debug, Clone)]
pub struct TransactionMetrics {
    /// Number of currently active transactions
    pub active_count: u64,
    /// Total number of transactions started
    pub total_started: u64,
    /// Total number of transactions committed
    pub total_committed: u64,
    /// Total number of transactions aborted
    pub total_aborted: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Total transactions that completed (committed + aborted)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }
}
