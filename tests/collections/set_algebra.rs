//! Set algebra through the facades, including large operands that span
//! many cursor batches.

use crate::common::*;
use tessera::{KeyspaceExt, SetExt};

#[test]
fn union_of_overlapping_sets() {
    let t = TestDb::new();
    t.add("a", &["1", "2", "3"]);
    t.add("b", &["2", "3", "4"]);
    let out = t.sets.union(&t.ks, &bytes(&["a", "b"])).unwrap();
    assert_eq!(strings(out), vec!["1", "2", "3", "4"]);
}

#[test]
fn intersection_and_difference() {
    let t = TestDb::new();
    t.add("a", &["1", "2", "3", "4"]);
    t.add("b", &["2", "4", "6"]);
    t.add("c", &["2", "4"]);

    let inter = t.sets.inter(&t.ks, &bytes(&["a", "b"])).unwrap();
    assert_eq!(strings(inter), vec!["2", "4"]);

    let diff = t.sets.diff(&t.ks, &bytes(&["a", "c"])).unwrap();
    assert_eq!(strings(diff), vec!["1", "3"]);

    let unchanged = t.sets.diff(&t.ks, &bytes(&["a", "nope"])).unwrap();
    assert_eq!(strings(unchanged), vec!["1", "2", "3", "4"]);
}

#[test]
fn intersection_with_missing_key_is_empty() {
    let t = TestDb::new();
    t.add("a", &["1", "2", "3"]);
    assert!(t.sets.inter(&t.ks, &bytes(&["a", "nope"])).unwrap().is_empty());
}

#[test]
fn merges_span_many_cursor_batches() {
    let t = TestDb::with_scan_batch(3);
    let evens: Vec<String> = (0..200).step_by(2).map(|i| format!("{:04}", i)).collect();
    let threes: Vec<String> = (0..200).step_by(3).map(|i| format!("{:04}", i)).collect();
    let evens_ref: Vec<&str> = evens.iter().map(String::as_str).collect();
    let threes_ref: Vec<&str> = threes.iter().map(String::as_str).collect();
    t.add("evens", &evens_ref);
    t.add("threes", &threes_ref);

    let sixes: Vec<String> = (0..200).step_by(6).map(|i| format!("{:04}", i)).collect();
    let inter = t.sets.inter(&t.ks, &bytes(&["evens", "threes"])).unwrap();
    assert_eq!(strings(inter), sixes);

    let union = t.sets.union(&t.ks, &bytes(&["evens", "threes"])).unwrap();
    assert_eq!(union.len(), 100 + 67 - 34);
    assert!(union.windows(2).all(|w| w[0] < w[1]));

    let diff = t.sets.diff(&t.ks, &bytes(&["evens", "threes"])).unwrap();
    assert_eq!(diff.len(), 100 - 34);
}

#[test]
fn store_variants_then_delete() {
    let t = TestDb::new();
    t.add("a", &["x", "y"]);
    t.add("b", &["y", "z"]);

    assert_eq!(t.sets.inter_store(&t.ks, b"dst", &bytes(&["a", "b"])).unwrap(), 1);
    assert_eq!(t.members("dst"), vec!["y"]);

    let deleted = t
        .db
        .transaction(t.ks.clone(), |txn| {
            let n = txn.key_delete(&bytes(&["dst"]))?;
            assert_eq!(txn.set_card(b"dst")?, 0);
            Ok(n)
        })
        .unwrap();
    assert_eq!(deleted, 1);
}

#[test]
fn scan_batch_size_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("tessera.toml"), "scan_batch_size = 2\n").unwrap();
    let t = TestDb::open_dir(dir.path());
    assert_eq!(t.db.config().scan_batch_size, 2);

    t.add("a", &["1", "2", "3", "4", "5"]);
    t.add("b", &["2", "3", "5", "8"]);
    t.add("c", &["3", "5", "9"]);

    let inter = t.sets.inter(&t.ks, &bytes(&["a", "b", "c"])).unwrap();
    assert_eq!(strings(inter), vec!["3", "5"]);
    let diff = t.sets.diff(&t.ks, &bytes(&["a", "b", "c"])).unwrap();
    assert_eq!(strings(diff), vec!["1", "4"]);
}
