//! Database: storage, transaction coordination and configuration
//!
//! ## Transaction API
//!
//! ```
//! use tessera_core::{keys, Keyspace};
//! use tessera_engine::Database;
//!
//! let db = Database::in_memory();
//! let ks = Keyspace::new("app", 0);
//! let key = keys::meta_key(&ks, b"greeting");
//!
//! db.transaction(ks.clone(), |txn| txn.set(key.clone(), b"hello".to_vec()))
//!     .unwrap();
//!
//! let mut txn = db.begin(ks).unwrap();
//! assert_eq!(txn.get(&key).unwrap(), Some(b"hello".to_vec()));
//! txn.commit().unwrap();
//! ```

mod config;
mod transactions;

pub use config::{GcConfig, TesseraConfig, CONFIG_FILE_NAME};
pub use transactions::RetryConfig;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use tessera_core::{validate_keyspace, Error, Keyspace, Limits, Result, Storage};
use tessera_storage::{PruneStats, UnifiedStore};

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::transaction::Transaction;

/// Main database struct
///
/// Owns the ordered MVCC store and the transaction coordinator. Share it
/// across threads with `Arc<Database>`.
pub struct Database {
    storage: Arc<UnifiedStore>,
    coordinator: TransactionCoordinator,
    config: TesseraConfig,
    data_dir: Option<PathBuf>,
}

impl Database {
    /// Open a database with an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn open(config: TesseraConfig) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self::build(config, None)))
    }

    /// Open a database whose configuration lives in `dir/tessera.toml`
    ///
    /// Creates the directory and a default config file if missing.
    pub fn open_dir<P: AsRef<Path>>(dir: P) -> Result<Arc<Self>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Config(format!(
                "Failed to create data directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let path = dir.join(CONFIG_FILE_NAME);
        TesseraConfig::write_default_if_missing(&path)?;
        let config = TesseraConfig::from_file(&path)?;
        Ok(Arc::new(Self::build(config, Some(dir.to_path_buf()))))
    }

    /// Open an in-memory database with default configuration
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::build(TesseraConfig::default(), None))
    }

    fn build(config: TesseraConfig, data_dir: Option<PathBuf>) -> Self {
        let storage = Arc::new(UnifiedStore::new());
        let coordinator = TransactionCoordinator::new(storage.current_version());
        info!(
            target: "tessera::txn",
            scan_batch_size = config.scan_batch_size,
            gc_enabled = config.gc.enabled,
            data_dir = ?data_dir,
            "database opened"
        );
        Self {
            storage,
            coordinator,
            config,
            data_dir,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    /// Key size limits from the configuration
    pub fn limits(&self) -> &Limits {
        &self.config.limits
    }

    /// Directory the config was loaded from, if any
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Underlying store, for diagnostics
    pub fn storage(&self) -> &UnifiedStore {
        &self.storage
    }

    /// Highest committed version
    pub fn current_version(&self) -> u64 {
        self.storage.current_version()
    }

    /// Begin a transaction scoped to `keyspace`
    ///
    /// The returned transaction must be committed; dropping it rolls back.
    pub fn begin(&self, keyspace: Keyspace) -> Result<Transaction<'_>> {
        validate_keyspace(&keyspace)?;
        let ctx = self.coordinator.start_transaction(&self.storage);
        Ok(Transaction::new(self, keyspace, ctx))
    }

    /// Execute a transaction with the given closure
    ///
    /// Commits on `Ok`, rolls back on `Err`. Conflicts are returned, not
    /// retried.
    pub fn transaction<F, T>(&self, keyspace: Keyspace, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut txn = self.begin(keyspace)?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.rollback_with_reason(&format!("closure error: {}", e));
                Err(e)
            }
        }
    }

    /// Execute a transaction with automatic retry on conflict
    ///
    /// The closure is called repeatedly until either:
    /// - The transaction commits successfully
    /// - A non-conflict error occurs (not retried)
    /// - Maximum retries are exceeded
    pub fn transaction_with_retry<F, T>(
        &self,
        keyspace: Keyspace,
        config: RetryConfig,
        f: F,
    ) -> Result<T>
    where
        F: Fn(&mut Transaction<'_>) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            match self.transaction(keyspace.clone(), &f) {
                Err(e) if e.is_conflict() && attempt < config.max_retries => {
                    let delay = config.calculate_delay(attempt);
                    debug!(
                        target: "tessera::txn",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying conflicted transaction"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Drop version history no live transaction can observe
    pub fn prune_versions(&self) -> PruneStats {
        let safe_point = self.coordinator.safe_point(self.storage.as_ref());
        self.storage.prune(safe_point)
    }

    /// Transaction counters
    pub fn stats(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    pub(crate) fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub(crate) fn store(&self) -> &Arc<UnifiedStore> {
        &self.storage
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let metrics = self.coordinator.metrics();
        info!(
            target: "tessera::txn",
            version = self.current_version(),
            committed = metrics.total_committed,
            aborted = metrics.total_aborted,
            "database closed"
        );
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.current_version())
            .field("data_dir", &self.data_dir)
            .finish()
    }
}
