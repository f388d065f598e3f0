//! Set algebra as streaming merges over sorted cursors
//!
//! Every operand is opened as a [`SetCursor`] on the same transaction, so
//! all of them read one consistent snapshot. The merges only ever move
//! cursors forward, which keeps each operator linear in the total number
//! of members and bounded in memory by the output.
//!
//! - **Union**: k-way merge emitting the smallest current member once and
//!   advancing every cursor positioned on it.
//! - **Intersection**: operand metas are batch-read first; an absent or
//!   empty operand ends the operation before any scan. Otherwise cursors
//!   chase a running maximum candidate until all agree on it.
//! - **Difference**: a primary cursor over the first operand, with the
//!   others advanced in lock-step to at least its current member.
//!
//! A failing cursor step aborts the operation with its error; no partial
//! result is returned.

use tessera_core::{keys, Error, ObjectType, Result, Timestamp};
use tessera_engine::Transaction;
use tracing::debug;

use crate::cursor::SetCursor;
use crate::keyspace::{check_key, decode_live, detach, read_meta};
use crate::meta::Meta;

/// Resolve operand metas in one batched read
///
/// Absent and expired operands come back as `None`.
fn operands(txn: &mut Transaction<'_>, names: &[Vec<u8>]) -> Result<Vec<Option<Meta>>> {
    if names.is_empty() {
        return Err(Error::invalid_argument("set algebra requires at least one key"));
    }
    for name in names {
        check_key(txn, name)?;
    }
    let meta_keys: Vec<Vec<u8>> = names
        .iter()
        .map(|name| keys::meta_key(txn.keyspace(), name))
        .collect();
    let raw = txn.batch_get(&meta_keys)?;

    let now = Timestamp::now();
    names
        .iter()
        .zip(raw)
        .map(|(name, raw)| decode_live(name, raw, ObjectType::Set, now))
        .collect()
}

fn open_all<'t>(txn: &'t Transaction<'_>, metas: &[Meta]) -> Result<Vec<SetCursor<'t>>> {
    metas.iter().map(|meta| SetCursor::open(txn, &meta.id)).collect()
}

pub(crate) fn union(txn: &mut Transaction<'_>, names: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    let metas: Vec<Meta> = operands(txn, names)?.into_iter().flatten().collect();
    let mut cursors = open_all(txn, &metas)?;
    merge_union(&mut cursors)
}

pub(crate) fn inter(txn: &mut Transaction<'_>, names: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    let resolved = operands(txn, names)?;
    if resolved.iter().any(|meta| meta.as_ref().map_or(true, |m| m.len == 0)) {
        return Ok(Vec::new());
    }
    let metas: Vec<Meta> = resolved.into_iter().flatten().collect();
    let mut cursors = open_all(txn, &metas)?;
    merge_inter(&mut cursors)
}

pub(crate) fn diff(txn: &mut Transaction<'_>, names: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    let mut resolved = operands(txn, names)?.into_iter();
    let Some(Some(primary)) = resolved.next() else {
        return Ok(Vec::new());
    };
    let mut metas = vec![primary];
    metas.extend(resolved.flatten());
    let mut cursors = open_all(txn, &metas)?;
    merge_diff(&mut cursors)
}

/// Overwrite `dst` with `members` as a fresh set
///
/// The previous collection at `dst`, of any type, is detached first. An
/// empty result leaves `dst` absent. Returns the stored cardinality.
pub(crate) fn store(txn: &mut Transaction<'_>, dst: &[u8], members: Vec<Vec<u8>>) -> Result<u64> {
    check_key(txn, dst)?;
    if let Some(old) = read_meta(txn, dst)? {
        detach(txn, dst, &old)?;
    }
    if members.is_empty() {
        return Ok(0);
    }

    let mut meta = Meta::new(ObjectType::Set, Timestamp::now());
    meta.len = members.len() as u64;
    let ks = txn.keyspace().clone();
    for member in &members {
        txn.set(keys::data_key(&ks, &meta.id, member), Vec::new())?;
    }
    txn.set(keys::meta_key(&ks, dst), meta.encode())?;
    debug!(target: "tessera::set", keyspace = %ks, id = %meta.id, len = meta.len, "algebra result stored");
    Ok(meta.len)
}

fn merge_union(cursors: &mut [SetCursor<'_>]) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    loop {
        let Some(min) = cursors
            .iter()
            .filter(|c| c.valid())
            .map(|c| c.member())
            .min()
            .map(<[u8]>::to_vec)
        else {
            return Ok(out);
        };
        for cursor in cursors.iter_mut() {
            if cursor.valid() && cursor.member() == min.as_slice() {
                cursor.next()?;
            }
        }
        out.push(min);
    }
}

fn merge_inter(cursors: &mut [SetCursor<'_>]) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    loop {
        let Some(first) = cursors.first() else {
            return Ok(out);
        };
        if !first.valid() {
            return Ok(out);
        }
        let mut candidate = first.member().to_vec();

        // restart the pass whenever some cursor overshoots the candidate
        'pass: loop {
            for cursor in cursors.iter_mut() {
                cursor.seek_ge(&candidate)?;
                if !cursor.valid() {
                    return Ok(out);
                }
                if cursor.member() > candidate.as_slice() {
                    candidate = cursor.member().to_vec();
                    continue 'pass;
                }
            }
            break;
        }

        out.push(candidate);
        cursors[0].next()?;
    }
}

fn merge_diff(cursors: &mut [SetCursor<'_>]) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    let Some((primary, others)) = cursors.split_first_mut() else {
        return Ok(out);
    };
    while primary.valid() {
        let member = primary.member();
        let mut excluded = false;
        for other in others.iter_mut() {
            other.seek_ge(member)?;
            if other.valid() && other.member() == member {
                excluded = true;
                break;
            }
        }
        if !excluded {
            out.push(member.to_vec());
        }
        primary.next()?;
    }
    Ok(out)
}
