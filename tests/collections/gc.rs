//! Reachability and boundedness of garbage collection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::*;
use tessera::{
    expire_sweep, keys, sweep, GcConfig, GcWorker, Keyspace, KeyspaceExt, Meta, ObjectId, Timestamp,
};

fn detached_hash(t: &TestDb, key: &[u8], fields: usize) -> ObjectId {
    for i in 0..fields {
        t.hashes
            .set(&t.ks, key, format!("field{:03}", i).as_bytes(), b"v".to_vec())
            .unwrap();
    }
    let id = current_id(t, key);
    t.db.transaction(t.ks.clone(), |txn| txn.key_delete(&[key.to_vec()]))
        .unwrap();
    id
}

fn current_id(t: &TestDb, key: &[u8]) -> ObjectId {
    id_in(t, &t.ks, key)
}

fn id_in(t: &TestDb, ks: &Keyspace, key: &[u8]) -> ObjectId {
    let mut txn = t.db.begin(ks.clone()).unwrap();
    let raw = txn.get(&keys::meta_key(ks, key)).unwrap().unwrap();
    txn.commit().unwrap();
    Meta::decode(&raw).unwrap().id
}

#[test]
fn detached_data_unreachable_then_reclaimed() {
    let t = TestDb::new();
    let id = detached_hash(&t, b"h", 10);

    assert!(t.hashes.get_all(&t.ks, b"h").unwrap().is_empty());
    assert_eq!(t.live_in(keys::data_range(&t.ks, &id)), 10);
    assert_eq!(t.live_in(keys::gc_range(&t.ks)), 1);

    sweep(&t.db, 0).unwrap();
    assert_eq!(t.live_in(keys::data_range(&t.ks, &id)), 0);
    assert_eq!(t.live_in(keys::gc_range(&t.ks)), 0);
}

#[test]
fn sweep_limit_bounds_deletions() {
    let t = TestDb::new();
    let id = detached_hash(&t, b"h", 10);

    let stats = sweep(&t.db, 5).unwrap();
    assert_eq!(stats.keys_deleted, 5);
    assert_eq!(t.live_in(keys::gc_range(&t.ks)), 1);
    assert_eq!(t.live_in(keys::data_range(&t.ks, &id)), 5);

    let stats = sweep(&t.db, 17).unwrap();
    assert_eq!(stats.keys_deleted, 5);
    assert_eq!(stats.entries_reclaimed, 1);
    assert_eq!(t.live_in(keys::gc_range(&t.ks)), 0);
}

#[test]
fn overwrite_queues_old_version() {
    let t = TestDb::new();
    t.add("src", &["1", "2"]);
    t.add("dst", &["old1", "old2", "old3"]);
    t.sets.union_store(&t.ks, b"dst", &bytes(&["src"])).unwrap();

    assert_eq!(t.members("dst"), vec!["1", "2"]);
    assert_eq!(t.live_in(keys::gc_range(&t.ks)), 1);
    let stats = sweep(&t.db, 0).unwrap();
    assert_eq!(stats.keys_deleted, 3);
    assert_eq!(t.members("dst"), vec!["1", "2"]);
}

#[test]
fn concurrent_sweeps_are_idempotent() {
    let t = TestDb::with_scan_batch(4);
    for k in 0..8 {
        detached_hash(&t, format!("h{}", k).as_bytes(), 10);
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&t.db);
            std::thread::spawn(move || {
                // overlapping sweeps commit blind deletes and never conflict
                for _ in 0..20 {
                    sweep(&db, 7).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sweep(&t.db, 0).unwrap();

    assert_eq!(t.live_in(keys::gc_range_all()), 0);
    assert_eq!(t.db.storage().live_count_in(b"", b""), 0);
}

#[test]
fn background_worker_reclaims_and_prunes() {
    let t = TestDb::new();
    detached_hash(&t, b"h", 12);
    let versions_before = t.db.storage().version_count();

    let worker = GcWorker::with_config(
        Arc::clone(&t.db),
        GcConfig {
            interval_ms: 10,
            batch_limit: 5,
            ..GcConfig::default()
        },
    );
    let handle = worker.start();
    let deadline = Instant::now() + Duration::from_secs(5);
    while t.live_in(keys::gc_range_all()) > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    // one more tick so pruning sees the final sweep
    std::thread::sleep(Duration::from_millis(50));
    worker.shutdown();
    handle.join().unwrap();

    assert_eq!(t.live_in(keys::gc_range_all()), 0);
    assert!(t.db.storage().version_count() < versions_before);
}

#[test]
fn expired_sets_reclaimed_across_keyspaces() {
    let t = TestDb::new();
    let other = Keyspace::new("other", 3);
    let soon = Timestamp::now().saturating_add(Duration::from_millis(20));
    for ks in [&t.ks, &other] {
        t.sets
            .add(ks, b"s", &[b"1".to_vec(), b"2".to_vec()])
            .unwrap();
        t.db.transaction(ks.clone(), |txn| txn.key_expire_at(b"s", soon))
            .unwrap();
    }
    let ids = [current_id(&t, b"s"), id_in(&t, &other, b"s")];
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(expire_sweep(&t.db, 0).unwrap(), 2);
    assert_eq!(t.live_in(keys::gc_range(&t.ks)), 1);
    assert_eq!(t.live_in(keys::gc_range(&other)), 1);

    sweep(&t.db, 0).unwrap();
    assert_eq!(t.live_in(keys::data_range(&t.ks, &ids[0])), 0);
    assert_eq!(t.live_in(keys::data_range(&other, &ids[1])), 0);
    assert_eq!(t.live_in(keys::gc_range_all()), 0);
}
