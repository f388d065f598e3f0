//! Physical key encoding
//!
//! Maps logical coordinates (keyspace, user key, collection version, member)
//! onto byte keys of the ordered store. Every function here is pure and
//! order-preserving.
//!
//! ## Layout
//!
//! ```text
//! keyspace  := ns_len:u16be | namespace | db:u32be
//! meta key  := 'u' | keyspace | 'M' | user_key
//! data key  := 'u' | keyspace | 'D' | object_id[16] | member
//! gc entry  := 's' | 'G' | keyspace | object_id[16]
//! expiry    := 's' | 'E' | expire_at:u64be | keyspace | user_key
//! ```
//!
//! - The length-prefixed namespace makes keyspace encodings prefix-free, so
//!   two keyspaces never share keys.
//! - The segment byte separates meta keys from data keys.
//! - The fixed-width object id keeps the data ranges of different collection
//!   versions disjoint, and the verbatim member suffix makes ascending data
//!   key order exactly ascending member order.
//! - GC entries live under the system tag, ordered by (namespace length,
//!   namespace, db, id), so a prefix scan enumerates pending reclamation
//!   work deterministically. Keyspaces compare length-first: `"b"` sorts
//!   before `"ab"`.
//! - Expiry index entries lead with the deadline, so every key due by a
//!   given instant lies in one prefix range regardless of keyspace.

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use crate::types::{Keyspace, ObjectId};
use byteorder::{BigEndian, ByteOrder};

/// Tag byte of user-visible key space (meta and data keys)
pub const USER_TAG: u8 = b'u';
/// Tag byte of system key space (GC entries, expiry index)
pub const SYS_TAG: u8 = b's';

const META_SEGMENT: u8 = b'M';
const DATA_SEGMENT: u8 = b'D';
const GC_SEGMENT: u8 = b'G';
const EXPIRY_SEGMENT: u8 = b'E';

fn push_keyspace(buf: &mut Vec<u8>, ks: &Keyspace) {
    let ns = ks.namespace.as_bytes();
    debug_assert!(ns.len() <= u16::MAX as usize, "namespace must be validated");
    let mut word = [0u8; 4];
    BigEndian::write_u16(&mut word[..2], ns.len() as u16);
    buf.extend_from_slice(&word[..2]);
    buf.extend_from_slice(ns);
    BigEndian::write_u32(&mut word, ks.db);
    buf.extend_from_slice(&word);
}

fn encoded_keyspace_len(ks: &Keyspace) -> usize {
    2 + ks.namespace.len() + 4
}

/// Meta key of a collection: one per user key
pub fn meta_key(ks: &Keyspace, user_key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + encoded_keyspace_len(ks) + user_key.len());
    buf.push(USER_TAG);
    push_keyspace(&mut buf, ks);
    buf.push(META_SEGMENT);
    buf.extend_from_slice(user_key);
    buf
}

/// Common prefix of every data key of one collection version
pub fn data_prefix(ks: &Keyspace, id: &ObjectId) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + encoded_keyspace_len(ks) + ObjectId::LEN);
    buf.push(USER_TAG);
    push_keyspace(&mut buf, ks);
    buf.push(DATA_SEGMENT);
    buf.extend_from_slice(id.as_bytes());
    buf
}

/// Data key of one member (or hash field) of a collection version
pub fn data_key(ks: &Keyspace, id: &ObjectId, member: &[u8]) -> Vec<u8> {
    let mut buf = data_prefix(ks, id);
    buf.extend_from_slice(member);
    buf
}

/// Half-open byte range `[start, end)` covering all data keys of a version
pub fn data_range(ks: &Keyspace, id: &ObjectId) -> (Vec<u8>, Vec<u8>) {
    let start = data_prefix(ks, id);
    let end = prefix_end(&start);
    (start, end)
}

/// Strip a data prefix from a data key, yielding the member bytes
///
/// Returns `None` if `key` does not start with `prefix`.
pub fn member_of<'a>(prefix: &[u8], key: &'a [u8]) -> Option<&'a [u8]> {
    key.strip_prefix(prefix)
}

/// GC entry key marking the data range of `id` as orphaned
pub fn gc_key(ks: &Keyspace, id: &ObjectId) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + encoded_keyspace_len(ks) + ObjectId::LEN);
    buf.push(SYS_TAG);
    buf.push(GC_SEGMENT);
    push_keyspace(&mut buf, ks);
    buf.extend_from_slice(id.as_bytes());
    buf
}

/// Range covering every GC entry of every keyspace
pub fn gc_range_all() -> (Vec<u8>, Vec<u8>) {
    let start = vec![SYS_TAG, GC_SEGMENT];
    let end = prefix_end(&start);
    (start, end)
}

/// Range covering the GC entries of one keyspace
pub fn gc_range(ks: &Keyspace) -> (Vec<u8>, Vec<u8>) {
    let mut start = vec![SYS_TAG, GC_SEGMENT];
    push_keyspace(&mut start, ks);
    let end = prefix_end(&start);
    (start, end)
}

/// Decode a GC entry key back into its keyspace and object id
pub fn decode_gc_key(raw: &[u8]) -> Result<(Keyspace, ObjectId)> {
    let bad = |what: &str| Error::corruption(format!("GC key {}: {:?}", what, raw));

    let rest = raw
        .strip_prefix(&[SYS_TAG, GC_SEGMENT][..])
        .ok_or_else(|| bad("has wrong prefix"))?;
    if rest.len() < 2 {
        return Err(bad("is truncated"));
    }
    let ns_len = BigEndian::read_u16(&rest[..2]) as usize;
    let rest = &rest[2..];
    if rest.len() != ns_len + 4 + ObjectId::LEN {
        return Err(bad("has wrong length"));
    }
    let namespace = std::str::from_utf8(&rest[..ns_len])
        .map_err(|_| bad("has non UTF-8 namespace"))?
        .to_string();
    let db = BigEndian::read_u32(&rest[ns_len..ns_len + 4]);
    let id = ObjectId::from_slice(&rest[ns_len + 4..]).ok_or_else(|| bad("has bad id"))?;
    Ok((Keyspace { namespace, db }, id))
}

/// Expiry index entry for `user_key` due at `at`
pub fn expiry_key(ks: &Keyspace, at: Timestamp, user_key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10 + encoded_keyspace_len(ks) + user_key.len());
    buf.push(SYS_TAG);
    buf.push(EXPIRY_SEGMENT);
    let mut word = [0u8; 8];
    BigEndian::write_u64(&mut word, at.as_millis());
    buf.extend_from_slice(&word);
    push_keyspace(&mut buf, ks);
    buf.extend_from_slice(user_key);
    buf
}

/// Range covering every expiry entry due at or before `now`
pub fn expiry_range_until(now: Timestamp) -> (Vec<u8>, Vec<u8>) {
    let start = vec![SYS_TAG, EXPIRY_SEGMENT];
    let end = match now.as_millis().checked_add(1) {
        Some(next) => {
            let mut end = start.clone();
            end.extend_from_slice(&next.to_be_bytes());
            end
        }
        None => prefix_end(&start),
    };
    (start, end)
}

/// Decode an expiry entry into its deadline, keyspace and user key
pub fn decode_expiry_key(raw: &[u8]) -> Result<(Timestamp, Keyspace, Vec<u8>)> {
    let bad = |what: &str| Error::corruption(format!("expiry key {}: {:?}", what, raw));

    let rest = raw
        .strip_prefix(&[SYS_TAG, EXPIRY_SEGMENT][..])
        .ok_or_else(|| bad("has wrong prefix"))?;
    if rest.len() < 10 {
        return Err(bad("is truncated"));
    }
    let at = Timestamp::from_millis(BigEndian::read_u64(&rest[..8]));
    let ns_len = BigEndian::read_u16(&rest[8..10]) as usize;
    let rest = &rest[10..];
    if rest.len() < ns_len + 4 {
        return Err(bad("is truncated"));
    }
    let namespace = std::str::from_utf8(&rest[..ns_len])
        .map_err(|_| bad("has non UTF-8 namespace"))?
        .to_string();
    let db = BigEndian::read_u32(&rest[ns_len..ns_len + 4]);
    Ok((at, Keyspace { namespace, db }, rest[ns_len + 4..].to_vec()))
}

/// Smallest key greater than every key starting with `prefix`
///
/// Returns an empty vector when no such key exists (prefix is all `0xff`);
/// an empty end bound means "unbounded" to the storage scan API.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    Vec::new()
}

/// Immediate successor of `key` in byte order
pub fn next_key(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0);
    next
}
