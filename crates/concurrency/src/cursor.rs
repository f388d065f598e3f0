//! Ordered range cursor over a transaction's view
//!
//! A `Cursor` walks `[start, end)` in ascending key order and yields what the
//! owning transaction would see: snapshot entries, overridden by the
//! transaction's buffered writes, minus its buffered deletes.
//!
//! Snapshot entries are fetched lazily in batches of `batch_size`, so memory
//! stays bounded by the batch no matter how large the range is. The cursor
//! borrows the transaction, which therefore cannot be mutated while the
//! cursor is open; the buffered write overlay is stable for its lifetime.
//! Dropping the cursor releases it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::Bound;

use tessera_core::keys::next_key;
use tessera_core::{Result, SnapshotView};

/// Lifetime-bound iterator over a transaction's view of a key range
pub struct Cursor<'t> {
    snapshot: &'t dyn SnapshotView,
    writes: &'t BTreeMap<Vec<u8>, Vec<u8>>,
    deletes: &'t BTreeSet<Vec<u8>>,
    end: Vec<u8>,
    batch_size: usize,
    /// Buffered snapshot entries not yet merged
    batch: VecDeque<(Vec<u8>, Vec<u8>)>,
    /// Where the next snapshot batch starts; None once exhausted
    resume: Option<Vec<u8>>,
    /// Lower bound for the next buffered write
    write_lower: Bound<Vec<u8>>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl<'t> Cursor<'t> {
    /// Open over `[start, end)` of `snapshot` with a write/delete overlay
    ///
    /// An empty `end` means unbounded. Transactions open cursors through
    /// their own `iter`; this is the building block underneath.
    pub fn open(
        snapshot: &'t dyn SnapshotView,
        writes: &'t BTreeMap<Vec<u8>, Vec<u8>>,
        deletes: &'t BTreeSet<Vec<u8>>,
        start: &[u8],
        end: &[u8],
        batch_size: usize,
    ) -> Result<Self> {
        let empty = !end.is_empty() && start >= end;
        let mut cursor = Cursor {
            snapshot,
            writes,
            deletes,
            end: end.to_vec(),
            batch_size: batch_size.max(1),
            batch: VecDeque::new(),
            resume: if empty { None } else { Some(start.to_vec()) },
            write_lower: Bound::Included(start.to_vec()),
            current: None,
        };
        if !empty {
            cursor.advance()?;
        }
        Ok(cursor)
    }

    /// True while the cursor is positioned on an entry
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Key of the current entry
    ///
    /// Returns an empty slice when the cursor is not valid.
    pub fn key(&self) -> &[u8] {
        match &self.current {
            Some((k, _)) => k,
            None => &[],
        }
    }

    /// Value of the current entry
    ///
    /// Returns an empty slice when the cursor is not valid.
    pub fn value(&self) -> &[u8] {
        match &self.current {
            Some((_, v)) => v,
            None => &[],
        }
    }

    /// Move to the next entry
    ///
    /// Calling `next` on an exhausted cursor is a no-op.
    pub fn next(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        self.advance()
    }

    fn shadowed(&self, key: &[u8]) -> bool {
        self.writes.contains_key(key) || self.deletes.contains(key)
    }

    fn fill(&mut self) -> Result<()> {
        let Some(from) = self.resume.take() else {
            return Ok(());
        };
        let entries = self.snapshot.scan(&from, &self.end, self.batch_size)?;
        if entries.len() == self.batch_size {
            if let Some((last, _)) = entries.last() {
                self.resume = Some(next_key(last));
            }
        }
        self.batch.extend(entries);
        Ok(())
    }

    fn peek_write(&self) -> Option<(&'t Vec<u8>, &'t Vec<u8>)> {
        let writes: &'t BTreeMap<Vec<u8>, Vec<u8>> = self.writes;
        let lower = match &self.write_lower {
            Bound::Included(k) => Bound::Included(k.as_slice()),
            Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let upper = if self.end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(self.end.as_slice())
        };
        writes.range::<[u8], _>((lower, upper)).next()
    }

    fn advance(&mut self) -> Result<()> {
        // Drop snapshot entries the transaction has overwritten or deleted
        loop {
            if self.batch.is_empty() {
                if self.resume.is_none() {
                    break;
                }
                self.fill()?;
                continue;
            }
            let shadowed = self
                .batch
                .front()
                .map_or(false, |(k, _)| self.shadowed(k));
            if !shadowed {
                break;
            }
            self.batch.pop_front();
        }

        let write = self.peek_write();
        let take_snapshot = match (self.batch.front(), write) {
            (None, None) => {
                self.current = None;
                return Ok(());
            }
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some((sk, _)), Some((wk, _))) => sk < wk,
        };

        if take_snapshot {
            self.current = self.batch.pop_front();
        } else if let Some((k, v)) = write {
            self.write_lower = Bound::Excluded(k.clone());
            self.current = Some((k.clone(), v.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("snapshot_version", &self.snapshot.version())
            .field("end", &self.end)
            .field("batch_size", &self.batch_size)
            .field("valid", &self.valid())
            .finish()
    }
}
