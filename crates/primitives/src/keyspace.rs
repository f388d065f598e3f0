//! Type-agnostic key operations and shared meta handling
//!
//! Every collection type resolves its key name through the helpers here:
//!
//! - Reads treat an absent or expired meta record as an empty collection.
//! - Writes to an absent key create a fresh version; writes to an expired
//!   key supersede it, queueing the old version for reclamation.
//! - Detaching a collection (delete, or the last member removed) deletes the
//!   meta record and writes a GC entry for its version in the same
//!   transaction, so the old data range is unreachable once committed.
//! - A meta record with a deadline has exactly one expiry index entry,
//!   keyed by that deadline. The GC worker walks the index to detach
//!   collections that expired without being touched again.

use tessera_core::{
    keys, validate_key_with_limits, Error, ObjectId, ObjectType, Result, Timestamp,
};
use tessera_engine::Transaction;
use tracing::debug;

use crate::extensions::KeyspaceExt;
use crate::meta::Meta;

/// Validate a user key against the database limits
pub(crate) fn check_key(txn: &Transaction<'_>, key: &[u8]) -> Result<()> {
    validate_key_with_limits(key, txn.limits())
}

/// Stored meta record, expired or not
pub(crate) fn read_meta(txn: &mut Transaction<'_>, key: &[u8]) -> Result<Option<Meta>> {
    let meta_key = keys::meta_key(txn.keyspace(), key);
    txn.get(&meta_key)?.map(|raw| Meta::decode(&raw)).transpose()
}

/// Decode a batch-read meta value for a read of type `expected`
pub(crate) fn decode_live(
    key: &[u8],
    raw: Option<Vec<u8>>,
    expected: ObjectType,
    now: Timestamp,
) -> Result<Option<Meta>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let meta = Meta::decode(&raw)?;
    if meta.is_expired(now) {
        return Ok(None);
    }
    if meta.object_type != expected {
        return Err(Error::wrong_type(key, expected, meta.object_type));
    }
    Ok(Some(meta))
}

/// Live meta record of type `expected`
///
/// # Errors
///
/// Returns `Error::WrongType` if the key holds another collection type.
pub(crate) fn typed_meta(
    txn: &mut Transaction<'_>,
    key: &[u8],
    expected: ObjectType,
) -> Result<Option<Meta>> {
    let meta_key = keys::meta_key(txn.keyspace(), key);
    let raw = txn.get(&meta_key)?;
    decode_live(key, raw, expected, Timestamp::now())
}

/// Meta record to mutate for a write of type `expected`
///
/// Returns the record and whether it is a fresh version not yet stored.
pub(crate) fn meta_for_write(
    txn: &mut Transaction<'_>,
    key: &[u8],
    expected: ObjectType,
) -> Result<(Meta, bool)> {
    let now = Timestamp::now();
    match read_meta(txn, key)? {
        Some(meta) if !meta.is_expired(now) => {
            if meta.object_type != expected {
                return Err(Error::wrong_type(key, expected, meta.object_type));
            }
            Ok((meta, false))
        }
        Some(expired) => {
            unindex_expiry(txn, key, &expired)?;
            queue_gc(txn, &expired.id)?;
            Ok((Meta::new(expected, now), true))
        }
        None => Ok((Meta::new(expected, now), true)),
    }
}

/// Persist a mutated meta record, detaching the collection once empty
pub(crate) fn save_meta(
    txn: &mut Transaction<'_>,
    key: &[u8],
    mut meta: Meta,
    fresh: bool,
) -> Result<()> {
    if meta.len == 0 {
        if fresh {
            return txn.delete(keys::meta_key(txn.keyspace(), key));
        }
        return detach(txn, key, &meta);
    }
    meta.updated_at = Timestamp::now();
    let meta_key = keys::meta_key(txn.keyspace(), key);
    txn.set(meta_key, meta.encode())
}

/// Unlink `meta` from `key` and queue its data range for reclamation
pub(crate) fn detach(txn: &mut Transaction<'_>, key: &[u8], meta: &Meta) -> Result<()> {
    txn.delete(keys::meta_key(txn.keyspace(), key))?;
    unindex_expiry(txn, key, meta)?;
    queue_gc(txn, &meta.id)?;
    debug!(
        target: "tessera::gc",
        keyspace = %txn.keyspace(),
        id = %meta.id,
        len = meta.len,
        "collection detached"
    );
    Ok(())
}

fn queue_gc(txn: &mut Transaction<'_>, id: &ObjectId) -> Result<()> {
    txn.set(keys::gc_key(txn.keyspace(), id), Vec::new())
}

fn unindex_expiry(txn: &mut Transaction<'_>, key: &[u8], meta: &Meta) -> Result<()> {
    if !meta.has_expiry() {
        return Ok(());
    }
    txn.delete(keys::expiry_key(txn.keyspace(), meta.expire_at, key))
}

/// Detach `key` if its meta still carries the deadline `at` and it has passed
///
/// Returns whether the collection was detached. A meta record that was
/// persisted, re-armed or replaced since the index entry was written is
/// left alone.
pub(crate) fn expire_due(txn: &mut Transaction<'_>, key: &[u8], at: Timestamp) -> Result<bool> {
    let now = Timestamp::now();
    match read_meta(txn, key)? {
        Some(meta) if meta.expire_at == at && meta.is_expired(now) => {
            detach(txn, key, &meta)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub(crate) fn delete(txn: &mut Transaction<'_>, names: &[Vec<u8>]) -> Result<u64> {
    let now = Timestamp::now();
    let mut deleted = 0;
    for name in names {
        check_key(txn, name)?;
        if let Some(meta) = read_meta(txn, name)? {
            // expired records are cleaned up but were already invisible
            if !meta.is_expired(now) {
                deleted += 1;
            }
            detach(txn, name, &meta)?;
        }
    }
    Ok(deleted)
}

pub(crate) fn exists(txn: &mut Transaction<'_>, names: &[Vec<u8>]) -> Result<u64> {
    let now = Timestamp::now();
    let mut count = 0;
    for name in names {
        check_key(txn, name)?;
        if matches!(read_meta(txn, name)?, Some(meta) if !meta.is_expired(now)) {
            count += 1;
        }
    }
    Ok(count)
}

pub(crate) fn object_type(txn: &mut Transaction<'_>, key: &[u8]) -> Result<Option<ObjectType>> {
    check_key(txn, key)?;
    let now = Timestamp::now();
    Ok(read_meta(txn, key)?
        .filter(|meta| !meta.is_expired(now))
        .map(|meta| meta.object_type))
}

pub(crate) fn expire_at(txn: &mut Transaction<'_>, key: &[u8], at: Timestamp) -> Result<bool> {
    check_key(txn, key)?;
    let now = Timestamp::now();
    let Some(mut meta) = read_meta(txn, key)?.filter(|meta| !meta.is_expired(now)) else {
        return Ok(false);
    };
    if at <= now {
        detach(txn, key, &meta)?;
        return Ok(true);
    }
    unindex_expiry(txn, key, &meta)?;
    txn.set(keys::expiry_key(txn.keyspace(), at, key), Vec::new())?;
    meta.expire_at = at;
    save_meta(txn, key, meta, false)?;
    Ok(true)
}

pub(crate) fn persist(txn: &mut Transaction<'_>, key: &[u8]) -> Result<bool> {
    check_key(txn, key)?;
    let now = Timestamp::now();
    match read_meta(txn, key)? {
        Some(mut meta) if meta.has_expiry() && !meta.is_expired(now) => {
            unindex_expiry(txn, key, &meta)?;
            meta.expire_at = Timestamp::EPOCH;
            save_meta(txn, key, meta, false)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub(crate) fn ttl_ms(txn: &mut Transaction<'_>, key: &[u8]) -> Result<i64> {
    check_key(txn, key)?;
    let now = Timestamp::now();
    Ok(match read_meta(txn, key)? {
        None => -2,
        Some(meta) if meta.is_expired(now) => -2,
        Some(meta) if !meta.has_expiry() => -1,
        Some(meta) => now.millis_until(meta.expire_at).min(i64::MAX as u64) as i64,
    })
}

impl KeyspaceExt for Transaction<'_> {
    fn key_delete(&mut self, keys: &[Vec<u8>]) -> Result<u64> {
        delete(self, keys)
    }

    fn key_exists(&mut self, keys: &[Vec<u8>]) -> Result<u64> {
        exists(self, keys)
    }

    fn key_type(&mut self, key: &[u8]) -> Result<Option<ObjectType>> {
        object_type(self, key)
    }

    fn key_expire_at(&mut self, key: &[u8], at: Timestamp) -> Result<bool> {
        expire_at(self, key, at)
    }

    fn key_persist(&mut self, key: &[u8]) -> Result<bool> {
        persist(self, key)
    }

    fn key_ttl_ms(&mut self, key: &[u8]) -> Result<i64> {
        ttl_ms(self, key)
    }
}
