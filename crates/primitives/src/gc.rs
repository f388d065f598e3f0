//! Garbage collection of detached collection versions
//!
//! Detaching a collection writes a GC entry `(namespace, db, id)` in the
//! same transaction that unlinks its meta record. From then on the data
//! range of `id` is unreachable, and [`sweep`] deletes it out of line:
//!
//! 1. Open a fresh transaction and walk GC entries in key order.
//! 2. Delete the data keys of the first entry, counting against `limit`.
//! 3. Once its range is empty, delete the entry and move to the next one.
//! 4. When `limit` runs out mid-range, commit and leave the entry for the
//!    next sweep.
//!
//! `limit == 0` means unbounded. Sweeps share no memory with foreground
//! transactions and are idempotent: deleting an absent key is a no-op, so
//! two sweeps racing over one entry both converge.
//!
//! Collections that expire and are never touched again would keep their
//! meta record forever. [`expire_sweep`] walks the expiry index up to the
//! current time and detaches each such collection, which hands its data
//! range to the next [`sweep`].
//!
//! [`GcWorker`] runs both periodically on a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tessera_core::{keys, Keyspace, Result, Timestamp};
use tessera_engine::{Database, GcConfig, Transaction};
use tracing::{debug, info, warn};

use crate::keyspace::expire_due;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// GC entries visited
    pub entries_scanned: u64,
    /// GC entries whose range was fully cleared and removed
    pub entries_reclaimed: u64,
    /// Data keys deleted
    pub keys_deleted: u64,
    /// Expired collections detached from the expiry index
    pub keys_expired: u64,
}

/// Run one bounded sweep
///
/// Deletes at most `limit` data keys (`0` = no bound) and commits once.
///
/// # Errors
///
/// Store errors abort the sweep with nothing applied; the GC entries stay
/// for the next run. Range reads are not tracked for conflicts, so a sweep
/// never conflicts with a concurrent one: both commit blind deletes, and
/// deleting the same keys twice is harmless.
pub fn sweep(db: &Database, limit: usize) -> Result<GcStats> {
    let budget = if limit == 0 { usize::MAX } else { limit };
    let chunk = db.config().scan_batch_size;
    let mut stats = GcStats::default();

    let mut txn = db.begin(Keyspace::default())?;
    let (mut from, end) = keys::gc_range_all();

    while (stats.keys_deleted as usize) < budget {
        let Some(entry) = first_key(&txn, &from, &end)? else {
            break;
        };
        stats.entries_scanned += 1;
        from = keys::next_key(&entry);

        let (ks, id) = match keys::decode_gc_key(&entry) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(target: "tessera::gc", error = %e, "dropping undecodable GC entry");
                txn.delete(entry)?;
                continue;
            }
        };

        let (start, stop) = keys::data_range(&ks, &id);
        let remaining = budget - stats.keys_deleted as usize;
        let (deleted, exhausted) = clear_range(&mut txn, &start, &stop, remaining, chunk)?;
        stats.keys_deleted += deleted as u64;

        if !exhausted {
            debug!(target: "tessera::gc", keyspace = %ks, %id, deleted, "sweep budget exhausted");
            break;
        }
        txn.delete(entry)?;
        stats.entries_reclaimed += 1;
    }

    let version = txn.commit()?;
    if stats.keys_deleted > 0 || stats.entries_reclaimed > 0 {
        info!(
            target: "tessera::gc",
            version,
            scanned = stats.entries_scanned,
            reclaimed = stats.entries_reclaimed,
            deleted = stats.keys_deleted,
            "sweep complete"
        );
    }
    Ok(stats)
}

/// Detach collections whose deadline has passed without a later access
///
/// Visits at most `limit` due expiry entries (`0` = no bound), each in its
/// own transaction on the entry's keyspace. Entries left behind by a
/// persist or a new deadline are dropped. Returns the number of
/// collections detached.
///
/// # Errors
///
/// Store errors abort the walk; entries already handled stay handled. A
/// conflict with a foreground writer skips the entry until the next run.
pub fn expire_sweep(db: &Database, limit: usize) -> Result<u64> {
    let budget = if limit == 0 { usize::MAX } else { limit };
    let (start, end) = keys::expiry_range_until(Timestamp::now());

    let txn = db.begin(Keyspace::default())?;
    let due = {
        let mut cursor = txn.iter(&start, &end)?;
        let mut due = Vec::new();
        while cursor.valid() && due.len() < budget {
            due.push(cursor.key().to_vec());
            cursor.next()?;
        }
        due
    };
    txn.commit()?;

    let mut expired = 0;
    for entry in due {
        let (at, ks, user_key) = match keys::decode_expiry_key(&entry) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(target: "tessera::gc", error = %e, "dropping undecodable expiry entry");
                db.transaction(Keyspace::default(), |txn| txn.delete(entry))?;
                continue;
            }
        };

        let outcome = db.transaction(ks.clone(), |txn| {
            let detached = expire_due(txn, &user_key, at)?;
            txn.delete(entry)?;
            Ok(detached)
        });
        match outcome {
            Ok(true) => expired += 1,
            Ok(false) => {}
            Err(e) if e.is_conflict() => {
                debug!(target: "tessera::gc", keyspace = %ks, error = %e, "expiry raced a writer");
            }
            Err(e) => return Err(e),
        }
    }

    if expired > 0 {
        info!(target: "tessera::gc", expired, "expired collections detached");
    }
    Ok(expired)
}

fn first_key(txn: &Transaction<'_>, start: &[u8], end: &[u8]) -> Result<Option<Vec<u8>>> {
    let cursor = txn.iter(start, end)?;
    Ok(cursor.valid().then(|| cursor.key().to_vec()))
}

/// Delete up to `budget` keys of `[start, end)` in chunks
///
/// Returns the number deleted and whether the range is now empty.
fn clear_range(
    txn: &mut Transaction<'_>,
    start: &[u8],
    end: &[u8],
    budget: usize,
    chunk: usize,
) -> Result<(usize, bool)> {
    let mut deleted = 0;
    let mut from = start.to_vec();
    loop {
        let take = (budget - deleted).min(chunk);
        // one extra key tells whether anything is left past this chunk
        let batch: Vec<Vec<u8>> = {
            let mut cursor = txn.iter(&from, end)?;
            let mut batch = Vec::with_capacity(take + 1);
            while cursor.valid() && batch.len() <= take {
                batch.push(cursor.key().to_vec());
                cursor.next()?;
            }
            batch
        };
        let more = batch.len() > take;
        for key in batch.into_iter().take(take) {
            from = keys::next_key(&key);
            txn.delete(key)?;
            deleted += 1;
        }
        if !more {
            return Ok((deleted, true));
        }
        if deleted == budget {
            return Ok((deleted, false));
        }
    }
}

/// Background GC task
///
/// Periodically detaches expired collections, sweeps GC entries and, if
/// configured, prunes MVCC history no live snapshot can observe.
///
/// # Example
///
/// ```
/// use tessera_engine::Database;
/// use tessera_primitives::GcWorker;
///
/// let db = Database::in_memory();
/// let worker = GcWorker::new(db);
/// let handle = worker.start();
///
/// // ... use the database ...
///
/// worker.shutdown();
/// handle.join().unwrap();
/// ```
pub struct GcWorker {
    db: Arc<Database>,
    config: GcConfig,
    shutdown: Arc<AtomicBool>,
    last: Arc<Mutex<Option<GcStats>>>,
}

impl GcWorker {
    /// Worker using the database's `[gc]` configuration
    pub fn new(db: Arc<Database>) -> Self {
        let config = db.config().gc.clone();
        Self::with_config(db, config)
    }

    /// Worker with explicit settings
    pub fn with_config(db: Arc<Database>, config: GcConfig) -> Self {
        Self {
            db,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Run one expiry walk, sweep (and prune) on the calling thread
    pub fn run_once(&self) -> Result<GcStats> {
        let stats = tick(&self.db, &self.config)?;
        *self.last.lock() = Some(stats);
        Ok(stats)
    }

    /// Start the background thread
    ///
    /// The thread exits immediately when GC is disabled, and otherwise
    /// runs until `shutdown()` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let db = Arc::clone(&self.db);
        let config = self.config.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let last = Arc::clone(&self.last);

        thread::spawn(move || {
            if !config.enabled {
                debug!(target: "tessera::gc", "GC disabled; worker not running");
                return;
            }
            let interval = Duration::from_millis(config.interval_ms);
            let slice = Duration::from_millis(100).min(interval);

            while !shutdown.load(Ordering::Relaxed) {
                let mut elapsed = Duration::ZERO;
                while elapsed < interval {
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(slice);
                    elapsed += slice;
                }

                match tick(&db, &config) {
                    Ok(stats) => *last.lock() = Some(stats),
                    Err(e) => warn!(target: "tessera::gc", error = %e, "GC sweep failed"),
                }
            }
        })
    }

    /// Signal shutdown
    ///
    /// The background thread exits within one sleep slice.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Stats of the most recent successful sweep
    pub fn last_stats(&self) -> Option<GcStats> {
        *self.last.lock()
    }
}

fn tick(db: &Database, config: &GcConfig) -> Result<GcStats> {
    let expired = expire_sweep(db, config.batch_limit)?;
    let mut stats = sweep(db, config.batch_limit)?;
    stats.keys_expired = expired;
    if config.prune_versions {
        let pruned = db.prune_versions();
        if pruned.versions_removed > 0 {
            debug!(
                target: "tessera::gc",
                versions = pruned.versions_removed,
                keys = pruned.keys_removed,
                "pruned version history"
            );
        }
    }
    Ok(stats)
}
