//! Randomized invariants: cardinality never drifts from the member count,
//! and the streaming merges agree with an in-memory model.

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::common::*;
use tessera::{Keyspace, SetExt};

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<u8>),
    Remove(Vec<u8>),
    Pop(i64),
    MoveOut(u8),
    MoveIn(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => proptest::collection::vec(0u8..16, 1..4).prop_map(Op::Add),
        2 => proptest::collection::vec(0u8..16, 1..4).prop_map(Op::Remove),
        1 => (-1i64..4).prop_map(Op::Pop),
        1 => (0u8..16).prop_map(Op::MoveOut),
        1 => (0u8..16).prop_map(Op::MoveIn),
    ]
}

fn member(b: u8) -> Vec<u8> {
    vec![b'm', b]
}

fn small_set() -> impl Strategy<Value = BTreeSet<u8>> {
    proptest::collection::btree_set(0u8..24, 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cardinality_matches_members(ops in proptest::collection::vec(op(), 1..24)) {
        let t = TestDb::with_scan_batch(3);
        let ks = Keyspace::new("prop", 0);
        let mut model = BTreeSet::new();
        let mut other = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(items) => {
                    let members: Vec<Vec<u8>> = items.iter().map(|b| member(*b)).collect();
                    let added = t.sets.add(&ks, b"s", &members).unwrap();
                    let before = model.len();
                    model.extend(members);
                    prop_assert_eq!(added as usize, model.len() - before);
                }
                Op::Remove(items) => {
                    let members: Vec<Vec<u8>> = items.iter().map(|b| member(*b)).collect();
                    let removed = t.sets.remove(&ks, b"s", &members).unwrap();
                    let before = model.len();
                    for m in &members {
                        model.remove(m);
                    }
                    prop_assert_eq!(removed as usize, before - model.len());
                }
                Op::Pop(count) => {
                    let popped = t.sets.pop(&ks, b"s", count).unwrap();
                    let expected: Vec<Vec<u8>> =
                        model.iter().take(count.max(0) as usize).cloned().collect();
                    prop_assert_eq!(&popped, &expected);
                    for m in &popped {
                        model.remove(m);
                    }
                }
                Op::MoveOut(b) => {
                    let moved = t.sets.move_member(&ks, b"s", b"o", &member(b)).unwrap();
                    prop_assert_eq!(moved, model.remove(&member(b)));
                    if moved {
                        other.insert(member(b));
                    }
                }
                Op::MoveIn(b) => {
                    let moved = t.sets.move_member(&ks, b"o", b"s", &member(b)).unwrap();
                    prop_assert_eq!(moved, other.remove(&member(b)));
                    if moved {
                        model.insert(member(b));
                    }
                }
            }

            let members = t.sets.members(&ks, b"s").unwrap();
            prop_assert_eq!(t.sets.card(&ks, b"s").unwrap() as usize, members.len());
            prop_assert_eq!(members, model.iter().cloned().collect::<Vec<_>>());
            prop_assert_eq!(t.sets.card(&ks, b"o").unwrap() as usize, other.len());
        }
    }

    #[test]
    fn merges_agree_with_model(a in small_set(), b in small_set(), c in small_set()) {
        let t = TestDb::with_scan_batch(2);
        let ks = Keyspace::new("alg", 0);
        for (key, set) in [(&b"a"[..], &a), (&b"b"[..], &b), (&b"c"[..], &c)] {
            if !set.is_empty() {
                let members: Vec<Vec<u8>> = set.iter().map(|x| member(*x)).collect();
                t.sets.add(&ks, key, &members).unwrap();
            }
        }
        let keys = bytes(&["a", "b", "c"]);
        let to_members = |s: BTreeSet<u8>| s.into_iter().map(member).collect::<Vec<_>>();

        let union: BTreeSet<u8> = a.iter().chain(&b).chain(&c).copied().collect();
        prop_assert_eq!(t.sets.union(&ks, &keys).unwrap(), to_members(union));

        let inter: BTreeSet<u8> = a.iter().filter(|x| b.contains(*x) && c.contains(*x)).copied().collect();
        prop_assert_eq!(t.sets.inter(&ks, &keys).unwrap(), to_members(inter));

        let diff: BTreeSet<u8> = a.iter().filter(|x| !b.contains(*x) && !c.contains(*x)).copied().collect();
        prop_assert_eq!(t.sets.diff(&ks, &keys).unwrap(), to_members(diff));

        let stored = t.sets.union_store(&ks, b"dst", &keys).unwrap();
        prop_assert_eq!(stored as usize, t.sets.members(&ks, b"dst").unwrap().len());
    }
}

#[test]
fn move_duplicate_keeps_destination_cardinality() {
    let t = TestDb::new();
    t.add("src", &["x", "y"]);
    t.add("dst", &["x"]);
    assert!(t.sets.move_member(&t.ks, b"src", b"dst", b"x").unwrap());
    assert_eq!(t.members("src"), vec!["y"]);
    assert_eq!(t.sets.card(&t.ks, b"dst").unwrap(), 1);

    let members = t
        .db
        .transaction(t.ks.clone(), |txn| txn.set_members(b"dst"))
        .unwrap();
    assert_eq!(strings(members), vec!["x"]);
}
