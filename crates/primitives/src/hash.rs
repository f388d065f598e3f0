//! HashStore: field → value maps
//!
//! A hash shares the set layout: one data key per field under the current
//! version id, holding the field value. Cardinality and logical deletion
//! follow the same rules as sets; removing the last field detaches the
//! hash and queues its version for reclamation.

use std::sync::Arc;

use tessera_core::{keys, Keyspace, ObjectType, Result};
use tessera_engine::{Database, Transaction};

use crate::cursor::SetCursor;
use crate::extensions::HashExt;
use crate::keyspace::{check_key, meta_for_write, save_meta, typed_meta};

pub(crate) fn set(txn: &mut Transaction<'_>, key: &[u8], field: &[u8], value: Vec<u8>) -> Result<bool> {
    check_key(txn, key)?;
    let (mut meta, fresh) = meta_for_write(txn, key, ObjectType::Hash)?;
    let data_key = keys::data_key(txn.keyspace(), &meta.id, field);
    let is_new = txn.get(&data_key)?.is_none();
    txn.set(data_key, value)?;
    if is_new {
        meta.len += 1;
    }
    save_meta(txn, key, meta, fresh)?;
    Ok(is_new)
}

pub(crate) fn get(txn: &mut Transaction<'_>, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
    check_key(txn, key)?;
    let Some(meta) = typed_meta(txn, key, ObjectType::Hash)? else {
        return Ok(None);
    };
    let data_key = keys::data_key(txn.keyspace(), &meta.id, field);
    txn.get(&data_key)
}

pub(crate) fn del(txn: &mut Transaction<'_>, key: &[u8], fields: &[Vec<u8>]) -> Result<u64> {
    check_key(txn, key)?;
    let Some(mut meta) = typed_meta(txn, key, ObjectType::Hash)? else {
        return Ok(0);
    };
    let ks = txn.keyspace().clone();
    let mut removed = 0;
    for field in fields {
        let data_key = keys::data_key(&ks, &meta.id, field);
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

pub(crate) fn len(txn: &mut Transaction<'_>, key: &[u8]) -> Result<u64> {
    check_key(txn, key)?;
    Ok(typed_meta(txn, key, ObjectType::Hash)?.map_or(0, |meta| meta.len))
}

pub(crate) fn get_all(txn: &mut Transaction<'_>, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    check_key(txn, key)?;
    let Some(meta) = typed_meta(txn, key, ObjectType::Hash)? else {
        return Ok(Vec::new());
    };
    let mut cursor = SetCursor::open(txn, &meta.id)?;
    let mut out = Vec::new();
    while cursor.valid() {
        out.push((cursor.member().to_vec(), cursor.value().to_vec()));
        cursor.next()?;
    }
    Ok(out)
}

impl HashExt for Transaction<'_> {
    fn hash_set(&mut self, key: &[u8], field: &[u8], value: Vec<u8>) -> Result<bool> {
        set(self, key, field, value)
    }

    fn hash_get(&mut self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        get(self, key, field)
    }

    fn hash_del(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<u64> {
        del(self, key, fields)
    }

    fn hash_len(&mut self, key: &[u8]) -> Result<u64> {
        len(self, key)
    }

    fn hash_exists(&mut self, key: &[u8], field: &[u8]) -> Result<bool> {
        Ok(get(self, key, field)?.is_some())
    }

    fn hash_get_all(&mut self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        get_all(self, key)
    }
}

/// Hash collection primitive
///
/// Stateless facade over Database; each method runs in its own implicit
/// transaction.
#[derive(Clone)]
pub struct HashStore {
    db: Arc<Database>,
}

impl HashStore {
    /// Create new HashStore instance
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the underlying database reference
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Set a field; true if it was new
    pub fn set(&self, ks: &Keyspace, key: &[u8], field: &[u8], value: Vec<u8>) -> Result<bool> {
        self.db
            .transaction(ks.clone(), |txn| txn.hash_set(key, field, value))
    }

    /// Read a field
    pub fn get(&self, ks: &Keyspace, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.transaction(ks.clone(), |txn| txn.hash_get(key, field))
    }

    /// Delete fields
    pub fn del(&self, ks: &Keyspace, key: &[u8], fields: &[Vec<u8>]) -> Result<u64> {
        self.db.transaction(ks.clone(), |txn| txn.hash_del(key, fields))
    }

    /// Number of fields
    pub fn len(&self, ks: &Keyspace, key: &[u8]) -> Result<u64> {
        self.db.transaction(ks.clone(), |txn| txn.hash_len(key))
    }

    /// Field existence
    pub fn exists(&self, ks: &Keyspace, key: &[u8], field: &[u8]) -> Result<bool> {
        self.db.transaction(ks.clone(), |txn| txn.hash_exists(key, field))
    }

    /// All field/value pairs, ascending by field
    pub fn get_all(&self, ks: &Keyspace, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.db.transaction(ks.clone(), |txn| txn.hash_get_all(key))
    }
}
