//! Cross-Collection Transaction Tests
//!
//! Sets, hashes and key operations sharing one transaction commit or roll
//! back together, and detached versions are reclaimed by the sweeper.

use std::sync::Arc;

use tessera_core::{keys, Error, Keyspace, ObjectType};
use tessera_engine::{Database, RetryConfig};
use tessera_primitives::{sweep, HashExt, HashStore, KeyspaceExt, SetExt, SetStore};

fn setup() -> (Arc<Database>, SetStore, HashStore) {
    let db = Database::in_memory();
    (Arc::clone(&db), SetStore::new(Arc::clone(&db)), HashStore::new(db))
}

fn ks() -> Keyspace {
    Keyspace::new("tenant", 0)
}

fn m(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|s| s.as_bytes().to_vec()).collect()
}

fn store_is_empty(db: &Database) -> bool {
    db.storage().live_count_in(b"", b"") == 0
}

#[test]
fn test_set_and_hash_commit_atomically() {
    let (db, sets, hashes) = setup();
    db.transaction(ks(), |txn| {
        txn.set_add(b"online", &m(&["u1", "u2"]))?;
        txn.hash_set(b"u1", b"name", b"ada".to_vec())?;
        Ok(())
    })
    .unwrap();

    assert_eq!(sets.card(&ks(), b"online").unwrap(), 2);
    assert_eq!(hashes.get(&ks(), b"u1", b"name").unwrap(), Some(b"ada".to_vec()));
}

#[test]
fn test_failed_transaction_rolls_back_everything() {
    let (db, sets, hashes) = setup();
    let result = db.transaction(ks(), |txn| {
        txn.set_add(b"online", &m(&["u1"]))?;
        txn.hash_set(b"u1", b"name", b"ada".to_vec())?;
        // second write to the hash as a set fails the whole transaction
        txn.set_add(b"u1", &m(&["x"]))
    });
    assert!(matches!(result, Err(Error::WrongType { .. })));

    assert_eq!(sets.card(&ks(), b"online").unwrap(), 0);
    assert_eq!(hashes.len(&ks(), b"u1").unwrap(), 0);
    assert!(store_is_empty(&db));
}

#[test]
fn test_keyspaces_are_isolated() {
    let (_db, sets, _) = setup();
    let other = Keyspace::new("tenant", 1);
    sets.add(&ks(), b"s", &m(&["a"])).unwrap();
    sets.add(&other, b"s", &m(&["b"])).unwrap();

    assert_eq!(sets.members(&ks(), b"s").unwrap(), m(&["a"]));
    assert_eq!(sets.members(&other, b"s").unwrap(), m(&["b"]));
    assert_eq!(
        sets.union(&Keyspace::new("elsewhere", 0), &m(&["s"])).unwrap(),
        Vec::<Vec<u8>>::new()
    );
}

#[test]
fn test_full_lifecycle_leaves_no_residue() {
    let (db, sets, hashes) = setup();
    sets.add(&ks(), b"a", &m(&["1", "2", "3"])).unwrap();
    sets.add(&ks(), b"b", &m(&["3", "4"])).unwrap();
    hashes.set(&ks(), b"h", b"f", b"v".to_vec()).unwrap();
    sets.union_store(&ks(), b"u", &m(&["a", "b"])).unwrap();
    sets.union_store(&ks(), b"u", &m(&["b"])).unwrap();
    sets.pop(&ks(), b"a", 10).unwrap();

    db.transaction(ks(), |txn| txn.key_delete(&m(&["b", "h", "u"])))
        .unwrap();

    let stats = sweep(&db, 0).unwrap();
    assert!(stats.entries_reclaimed >= 4);
    assert!(store_is_empty(&db));
}

#[test]
fn test_gc_entries_are_per_keyspace_and_ordered() {
    let (db, sets, _) = setup();
    let other = Keyspace::new("tenant", 1);
    sets.add(&ks(), b"s", &m(&["a"])).unwrap();
    sets.add(&other, b"s", &m(&["a"])).unwrap();
    sets.remove(&ks(), b"s", &m(&["a"])).unwrap();
    sets.remove(&other, b"s", &m(&["a"])).unwrap();

    let (start, end) = keys::gc_range(&ks());
    assert_eq!(db.storage().live_count_in(&start, &end), 1);
    let (start, end) = keys::gc_range_all();
    assert_eq!(db.storage().live_count_in(&start, &end), 2);
}

#[test]
fn test_type_changes_after_delete() {
    let (db, sets, hashes) = setup();
    sets.add(&ks(), b"k", &m(&["a"])).unwrap();
    db.transaction(ks(), |txn| txn.key_delete(&m(&["k"])))
        .unwrap();
    hashes.set(&ks(), b"k", b"f", Vec::new()).unwrap();

    let kind = db.transaction(ks(), |txn| txn.key_type(b"k")).unwrap();
    assert_eq!(kind, Some(ObjectType::Hash));
    assert!(sets.members(&ks(), b"k").unwrap_err().is_wrong_type());
}

#[test]
fn test_concurrent_adds_with_retry_lose_nothing() {
    let (db, sets, _) = setup();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                for i in 0..20 {
                    let member = format!("t{}-{}", t, i).into_bytes();
                    db.transaction_with_retry(
                        ks(),
                        RetryConfig::new().with_max_retries(100).with_base_delay_ms(1),
                        |txn| txn.set_add(b"shared", &[member.clone()]),
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sets.card(&ks(), b"shared").unwrap(), 80);
    assert_eq!(sets.members(&ks(), b"shared").unwrap().len(), 80);
}
