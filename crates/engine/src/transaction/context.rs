//! Transaction wrapper around TransactionContext
//!
//! Keys passed here are physical keys built with `tessera_core::keys`; the
//! keyspace recorded on the transaction tells collection code which prefix
//! to build them under.

use tessera_concurrency::{Cursor, TransactionContext};
use tessera_core::{Keyspace, Limits, Result};

use crate::database::Database;

/// A live transaction bound to one keyspace
///
/// # Usage
///
/// ```
/// use tessera_core::{keys, Keyspace};
/// use tessera_engine::Database;
///
/// let db = Database::in_memory();
/// let ks = Keyspace::new("app", 0);
/// let mut txn = db.begin(ks.clone()).unwrap();
/// let start = keys::meta_key(&ks, b"a");
///
/// txn.set(start.clone(), b"1".to_vec()).unwrap();
/// let cursor = txn.iter(&start, b"").unwrap();
/// assert!(cursor.valid());
/// assert_eq!(cursor.value(), b"1");
/// drop(cursor);
///
/// txn.commit().unwrap();
/// ```
pub struct Transaction<'db> {
    db: &'db Database,
    keyspace: Keyspace,
    ctx: TransactionContext,
    finished: bool,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, keyspace: Keyspace, ctx: TransactionContext) -> Self {
        Self {
            db,
            keyspace,
            ctx,
            finished: false,
        }
    }

    /// Keyspace this transaction is scoped to
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Key size limits of the owning database
    pub fn limits(&self) -> &Limits {
        self.db.limits()
    }

    /// Entries fetched per cursor batch
    pub fn scan_batch_size(&self) -> usize {
        self.db.config().scan_batch_size
    }

    /// Snapshot version this transaction reads at
    pub fn start_version(&self) -> u64 {
        self.ctx.start_version
    }

    /// Transaction ID
    pub fn id(&self) -> u64 {
        self.ctx.txn_id
    }

    /// Point read; sees this transaction's own writes
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ctx.get(key)
    }

    /// Buffer a write
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.ctx.put(key, value)
    }

    /// Buffer a delete; deleting an absent key is a no-op at commit
    pub fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.ctx.delete(key)
    }

    /// Read several keys; results are in request order
    pub fn batch_get(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        let refs: Vec<&[u8]> = keys.iter().map(Vec::as_slice).collect();
        self.ctx.batch_get(&refs)
    }

    /// Ordered cursor over `[start, end)`; empty `end` is unbounded
    ///
    /// The cursor borrows the transaction, so it is closed before any
    /// further write can be issued.
    pub fn iter(&self, start: &[u8], end: &[u8]) -> Result<Cursor<'_>> {
        self.ctx.scan(start, end, self.scan_batch_size())
    }

    /// Validate and apply; returns the commit version
    ///
    /// Read-only transactions return their snapshot version.
    pub fn commit(mut self) -> Result<u64> {
        self.finished = true;
        self.db.coordinator().commit(&mut self.ctx, self.db.store().as_ref())
    }

    /// Discard all buffered writes
    pub fn rollback(mut self) {
        self.rollback_with_reason("rollback");
    }

    pub(crate) fn rollback_with_reason(&mut self, reason: &str) {
        if !self.finished {
            self.finished = true;
            self.db.coordinator().abort(&mut self.ctx, reason);
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.rollback_with_reason("dropped without commit");
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("keyspace", &self.keyspace)
            .field("ctx", &self.ctx)
            .finish()
    }
}
