//! Sorted cursor over one collection version
//!
//! A `SetCursor` walks the data-key range of a single collection version in
//! ascending member order, as seen by the owning transaction. It borrows the
//! transaction, so it can never outlive it, and it is released by `Drop` on
//! every exit path, including `?` returns in the middle of a merge.

use tessera_core::{keys, ObjectId, Result};
use tessera_engine::transaction::Cursor;
use tessera_engine::Transaction;

/// Forward-only view of a collection's members
pub struct SetCursor<'t> {
    inner: Cursor<'t>,
    prefix_len: usize,
}

impl<'t> SetCursor<'t> {
    /// Open over the data range of collection version `id`
    pub fn open(txn: &'t Transaction<'_>, id: &ObjectId) -> Result<Self> {
        let (start, end) = keys::data_range(txn.keyspace(), id);
        let inner = txn.iter(&start, &end)?;
        Ok(Self {
            inner,
            prefix_len: start.len(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_cursor(inner: Cursor<'t>, prefix_len: usize) -> Self {
        Self { inner, prefix_len }
    }

    /// True while positioned on a member
    pub fn valid(&self) -> bool {
        self.inner.valid()
    }

    /// Current member bytes (or hash field); empty when not valid
    pub fn member(&self) -> &[u8] {
        self.inner.key().get(self.prefix_len..).unwrap_or_default()
    }

    /// Payload stored with the current member (hash field value)
    pub fn value(&self) -> &[u8] {
        self.inner.value()
    }

    /// Advance to the next member
    pub fn next(&mut self) -> Result<()> {
        self.inner.next()
    }

    /// Advance while the current member is below `target`
    pub fn seek_ge(&mut self, target: &[u8]) -> Result<()> {
        while self.valid() && self.member() < target {
            self.next()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SetCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetCursor")
            .field("valid", &self.valid())
            .field("member", &self.member())
            .finish()
    }
}
