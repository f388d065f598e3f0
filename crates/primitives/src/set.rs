//! SetStore: unordered sets of unique byte-string members
//!
//! ## Design
//!
//! A set is a meta record plus one data key per member, ordered by member
//! bytes, with an empty value. `len` in the meta record is updated in the
//! same transaction as the data keys, so `card` never scans.
//!
//! SetStore is a stateless facade over the Database engine. It holds no
//! in-memory state beyond an `Arc<Database>` reference.
//!
//! ## Thread Safety
//!
//! SetStore is `Send + Sync` and can be shared across threads. Concurrent
//! writers to one set are serialized by commit-time conflict detection;
//! conflicts are returned to the caller, never retried here.
//!
//! ## API
//!
//! - **Single-Operation API**: every `SetStore` method runs in its own
//!   implicit transaction.
//! - **Multi-Operation API**: `SetExt` on `Transaction` composes operations
//!   in one caller-managed transaction.
//!
//! ## Pop order
//!
//! `pop` removes the smallest members first. Members are only reachable in
//! key order, so uniform random selection is not offered.

use std::sync::Arc;

use tessera_core::{keys, Error, Keyspace, ObjectType, Result};
use tessera_engine::{Database, Transaction};
use tracing::debug;

use crate::algebra;
use crate::cursor::SetCursor;
use crate::extensions::SetExt;
use crate::keyspace::{check_key, meta_for_write, save_meta, typed_meta};

pub(crate) fn add(txn: &mut Transaction<'_>, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
    check_key(txn, key)?;
    if members.is_empty() {
        return Err(Error::invalid_argument("set add requires at least one member"));
    }
    let (mut meta, fresh) = meta_for_write(txn, key, ObjectType::Set)?;
    let ks = txn.keyspace().clone();

    let mut added = 0;
    for member in members {
        let data_key = keys::data_key(&ks, &meta.id, member);
        if txn.get(&data_key)?.is_none() {
            txn.set(data_key, Vec::new())?;
            added += 1;
        }
    }
    if added > 0 {
        meta.len += added;
        save_meta(txn, key, meta, fresh)?;
    }
    Ok(added)
}

pub(crate) fn members(txn: &mut Transaction<'_>, key: &[u8]) -> Result<Vec<Vec<u8>>> {
    let Some(mut cursor) = scan(txn, key)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    while cursor.valid() {
        out.push(cursor.member().to_vec());
        cursor.next()?;
    }
    Ok(out)
}

pub(crate) fn card(txn: &mut Transaction<'_>, key: &[u8]) -> Result<u64> {
    check_key(txn, key)?;
    Ok(typed_meta(txn, key, ObjectType::Set)?.map_or(0, |meta| meta.len))
}

pub(crate) fn is_member(txn: &mut Transaction<'_>, key: &[u8], member: &[u8]) -> Result<bool> {
    check_key(txn, key)?;
    let Some(meta) = typed_meta(txn, key, ObjectType::Set)? else {
        return Ok(false);
    };
    let data_key = keys::data_key(txn.keyspace(), &meta.id, member);
    Ok(txn.get(&data_key)?.is_some())
}

pub(crate) fn remove(txn: &mut Transaction<'_>, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
    check_key(txn, key)?;
    let Some(mut meta) = typed_meta(txn, key, ObjectType::Set)? else {
        return Ok(0);
    };
    let ks = txn.keyspace().clone();

    let mut removed = 0;
    for member in members {
        let data_key = keys::data_key(&ks, &meta.id, member);
        if txn.get(&data_key)?.is_some() {
            txn.delete(data_key)?;
            removed += 1;
        }
    }
    if removed > 0 {
        meta.len = meta.len.saturating_sub(removed);
        save_meta(txn, key, meta, false)?;
    }
    Ok(removed)
}

pub(crate) fn pop(txn: &mut Transaction<'_>, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>> {
    check_key(txn, key)?;
    if count <= 0 {
        return Ok(Vec::new());
    }
    let Some(mut meta) = typed_meta(txn, key, ObjectType::Set)? else {
        return Ok(Vec::new());
    };
    let want = (count as u64).min(meta.len) as usize;

    let popped = {
        let mut cursor = SetCursor::open(txn, &meta.id)?;
        let mut out = Vec::with_capacity(want);
        while cursor.valid() && out.len() < want {
            out.push(cursor.member().to_vec());
            cursor.next()?;
        }
        out
    };

    let ks = txn.keyspace().clone();
    for member in &popped {
        txn.delete(keys::data_key(&ks, &meta.id, member))?;
    }
    if !popped.is_empty() {
        meta.len = meta.len.saturating_sub(popped.len() as u64);
        save_meta(txn, key, meta, false)?;
    }
    Ok(popped)
}

pub(crate) fn move_member(
    txn: &mut Transaction<'_>,
    src: &[u8],
    dst: &[u8],
    member: &[u8],
) -> Result<bool> {
    check_key(txn, src)?;
    check_key(txn, dst)?;
    let src_meta = typed_meta(txn, src, ObjectType::Set)?;
    // destination must be a set (or absent) before anything is touched
    typed_meta(txn, dst, ObjectType::Set)?;

    let Some(mut src_meta) = src_meta else {
        return Ok(false);
    };
    let ks = txn.keyspace().clone();
    let src_key = keys::data_key(&ks, &src_meta.id, member);
    if txn.get(&src_key)?.is_none() {
        return Ok(false);
    }
    if src == dst {
        return Ok(true);
    }

    txn.delete(src_key)?;
    src_meta.len = src_meta.len.saturating_sub(1);
    save_meta(txn, src, src_meta, false)?;

    let (mut dst_meta, fresh) = meta_for_write(txn, dst, ObjectType::Set)?;
    let dst_key = keys::data_key(&ks, &dst_meta.id, member);
    if txn.get(&dst_key)?.is_none() {
        txn.set(dst_key, Vec::new())?;
        dst_meta.len += 1;
        save_meta(txn, dst, dst_meta, fresh)?;
    }
    debug!(target: "tessera::set", keyspace = %ks, "member moved");
    Ok(true)
}

pub(crate) fn scan<'t>(txn: &'t mut Transaction<'_>, key: &[u8]) -> Result<Option<SetCursor<'t>>> {
    check_key(txn, key)?;
    let Some(meta) = typed_meta(txn, key, ObjectType::Set)? else {
        return Ok(None);
    };
    let txn: &'t Transaction<'_> = txn;
    SetCursor::open(txn, &meta.id).map(Some)
}

impl SetExt for Transaction<'_> {
    fn set_add(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        add(self, key, members)
    }

    fn set_members(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        members(self, key)
    }

    fn set_card(&mut self, key: &[u8]) -> Result<u64> {
        card(self, key)
    }

    fn set_is_member(&mut self, key: &[u8], member: &[u8]) -> Result<bool> {
        is_member(self, key, member)
    }

    fn set_remove(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        remove(self, key, members)
    }

    fn set_pop(&mut self, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>> {
        pop(self, key, count)
    }

    fn set_move(&mut self, src: &[u8], dst: &[u8], member: &[u8]) -> Result<bool> {
        move_member(self, src, dst, member)
    }

    fn set_scan(&mut self, key: &[u8]) -> Result<Option<SetCursor<'_>>> {
        scan(self, key)
    }

    fn set_union(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        algebra::union(self, keys)
    }

    fn set_inter(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        algebra::inter(self, keys)
    }

    fn set_diff(&mut self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        algebra::diff(self, keys)
    }

    fn set_union_store(&mut self, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64> {
        let result = algebra::union(self, keys)?;
        algebra::store(self, dst, result)
    }

    fn set_inter_store(&mut self, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64> {
        let result = algebra::inter(self, keys)?;
        algebra::store(self, dst, result)
    }

    fn set_diff_store(&mut self, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64> {
        let result = algebra::diff(self, keys)?;
        algebra::store(self, dst, result)
    }
}

/// Set collection primitive
///
/// Stateless facade over Database - all state lives in storage.
///
/// # Example
///
/// ```
/// use tessera_core::Keyspace;
/// use tessera_engine::Database;
/// use tessera_primitives::SetStore;
///
/// let sets = SetStore::new(Database::in_memory());
/// let ks = Keyspace::new("app", 0);
///
/// assert_eq!(sets.add(&ks, b"s", &[b"b".to_vec(), b"a".to_vec(), b"a".to_vec()]).unwrap(), 2);
/// assert_eq!(sets.members(&ks, b"s").unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
/// assert_eq!(sets.card(&ks, b"s").unwrap(), 2);
/// ```
#[derive(Clone)]
pub struct SetStore {
    db: Arc<Database>,
}

impl SetStore {
    /// Create new SetStore instance
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the underlying database reference
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Add members; returns how many were new
    pub fn add(&self, ks: &Keyspace, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.db.transaction(ks.clone(), |txn| txn.set_add(key, members))
    }

    /// All members, ascending
    pub fn members(&self, ks: &Keyspace, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.db.transaction(ks.clone(), |txn| txn.set_members(key))
    }

    /// Cardinality
    pub fn card(&self, ks: &Keyspace, key: &[u8]) -> Result<u64> {
        self.db.transaction(ks.clone(), |txn| txn.set_card(key))
    }

    /// Membership test
    pub fn is_member(&self, ks: &Keyspace, key: &[u8], member: &[u8]) -> Result<bool> {
        self.db
            .transaction(ks.clone(), |txn| txn.set_is_member(key, member))
    }

    /// Remove members; returns how many were present
    pub fn remove(&self, ks: &Keyspace, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.db.transaction(ks.clone(), |txn| txn.set_remove(key, members))
    }

    /// Remove and return up to `count` members, smallest first
    pub fn pop(&self, ks: &Keyspace, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>> {
        self.db.transaction(ks.clone(), |txn| txn.set_pop(key, count))
    }

    /// Move a member between sets
    pub fn move_member(&self, ks: &Keyspace, src: &[u8], dst: &[u8], member: &[u8]) -> Result<bool> {
        self.db
            .transaction(ks.clone(), |txn| txn.set_move(src, dst, member))
    }

    /// Union of `keys`
    pub fn union(&self, ks: &Keyspace, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        self.db.transaction(ks.clone(), |txn| txn.set_union(keys))
    }

    /// Intersection of `keys`
    pub fn inter(&self, ks: &Keyspace, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        self.db.transaction(ks.clone(), |txn| txn.set_inter(keys))
    }

    /// `keys[0]` minus the rest
    pub fn diff(&self, ks: &Keyspace, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        self.db.transaction(ks.clone(), |txn| txn.set_diff(keys))
    }

    /// Store the union in `dst`
    pub fn union_store(&self, ks: &Keyspace, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64> {
        self.db
            .transaction(ks.clone(), |txn| txn.set_union_store(dst, keys))
    }

    /// Store the intersection in `dst`
    pub fn inter_store(&self, ks: &Keyspace, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64> {
        self.db
            .transaction(ks.clone(), |txn| txn.set_inter_store(dst, keys))
    }

    /// Store the difference in `dst`
    pub fn diff_store(&self, ks: &Keyspace, dst: &[u8], keys: &[Vec<u8>]) -> Result<u64> {
        self.db
            .transaction(ks.clone(), |txn| txn.set_diff_store(dst, keys))
    }
}
