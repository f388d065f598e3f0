//! Set algebra observes one snapshot while other transactions commit.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::*;
use tessera::SetExt;

fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{:03}", prefix, i)).collect()
}

fn refs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

#[test]
fn cursor_ignores_commit_mid_scan() {
    let t = TestDb::with_scan_batch(2);
    let before = numbered("a", 20);
    t.add("a", &refs(&before));

    let mut reader = t.db.begin(t.ks.clone()).unwrap();
    let mut cursor = reader.set_scan(b"a").unwrap().unwrap();
    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(String::from_utf8(cursor.member().to_vec()).unwrap());
        cursor.next().unwrap();
    }

    // replace every member while the cursor is half way through
    t.db.transaction(t.ks.clone(), |txn| {
        txn.set_remove(b"a", &bytes(&refs(&before)))?;
        txn.set_add(b"a", &bytes(&["zzz"]))
    })
    .unwrap();

    while cursor.valid() {
        seen.push(String::from_utf8(cursor.member().to_vec()).unwrap());
        cursor.next().unwrap();
    }
    drop(cursor);
    reader.commit().unwrap();

    assert_eq!(seen, before);
    assert_eq!(t.members("a"), vec!["zzz"]);
}

#[test]
fn algebra_sees_state_at_begin() {
    let t = TestDb::new();
    t.add("a", &["1", "2"]);
    t.add("b", &["2", "3"]);

    let mut reader = t.db.begin(t.ks.clone()).unwrap();
    t.sets.add(&t.ks, b"a", &bytes(&["3"])).unwrap();
    t.sets.remove(&t.ks, b"b", &bytes(&["2"])).unwrap();

    let inter = reader.set_inter(&bytes(&["a", "b"])).unwrap();
    assert_eq!(strings(inter), vec!["2"]);
    reader.commit().unwrap();

    let inter = t.sets.inter(&t.ks, &bytes(&["a", "b"])).unwrap();
    assert_eq!(strings(inter), vec!["3"]);
}

#[test]
fn concurrent_readers_never_see_a_mix() {
    let t = TestDb::with_scan_batch(4);
    let state_x = numbered("x", 30);
    let state_y = numbered("y", 30);
    t.add("a", &refs(&state_x));
    t.add("b", &["common"]);

    let mut expect_x = state_x.clone();
    expect_x.insert(0, "common".to_string());
    let mut expect_y = state_y.clone();
    expect_y.insert(0, "common".to_string());

    let stop = Arc::new(AtomicBool::new(false));
    let observed = Arc::new(Mutex::new(HashSet::new()));

    let writer = {
        let db = Arc::clone(&t.db);
        let ks = t.ks.clone();
        let stop = Arc::clone(&stop);
        let (x, y) = (bytes(&refs(&state_x)), bytes(&refs(&state_y)));
        std::thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let (from, to) = if flip { (&y, &x) } else { (&x, &y) };
                db.transaction(ks.clone(), |txn| {
                    txn.set_remove(b"a", from)?;
                    txn.set_add(b"a", to)
                })
                .unwrap();
                flip = !flip;
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let db = Arc::clone(&t.db);
            let ks = t.ks.clone();
            let observed = Arc::clone(&observed);
            let (expect_x, expect_y) = (expect_x.clone(), expect_y.clone());
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let union = db
                        .transaction(ks.clone(), |txn| txn.set_union(&bytes(&["a", "b"])))
                        .unwrap();
                    let union = strings(union);
                    if union == expect_x {
                        observed.lock().insert('x');
                    } else if union == expect_y {
                        observed.lock().insert('y');
                    } else {
                        panic!("mixed snapshot: {:?}", union);
                    }
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();

    assert!(!observed.lock().is_empty());
}
