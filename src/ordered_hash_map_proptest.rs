#![cfg(test)]

// Property tests for OrderedHashMap kept inside the crate so the internal
// layer can be exercised without widening its visibility.

use crate::ordered_hash_map::tests::new_map;
use crate::ordered_hash_map::OrderedHashMap;
use proptest::prelude::*;
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    RetainEven,
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            2 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::RetainEven),
            1 => Just(OpI::Clear),
            2 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Reference model: a Vec in first-insertion order with linear lookup.
fn model_pos(model: &[(String, i32)], k: &str) -> Option<usize> {
    model.iter().position(|(mk, _)| mk == k)
}

fn run_ops<S: BuildHasher>(
    mut sut: OrderedHashMap<String, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(String, i32)> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let prev = sut.insert_or_replace(k.clone(), v);
                match model_pos(&model, &k) {
                    Some(p) => {
                        prop_assert_eq!(prev, Some(model[p].1), "replace returns old value");
                        model[p].1 = v;
                    }
                    None => {
                        prop_assert_eq!(prev, None, "fresh insert returns nothing");
                        model.push((k, v));
                    }
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove_key(k.as_str());
                match model_pos(&model, k) {
                    Some(p) => {
                        let expected = model.remove(p);
                        prop_assert_eq!(removed, Some(expected));
                    }
                    None => prop_assert!(removed.is_none()),
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                let expected = model_pos(&model, k).map(|p| &model[p].1);
                prop_assert_eq!(sut.get(k.as_str()), expected);
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model_pos(&model, &s).is_some());
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k.as_str()), model_pos(&model, k)) {
                    (Some(v), Some(p)) => {
                        *v = v.saturating_add(d);
                        model[p].1 = model[p].1.saturating_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence diverged from model"),
                }
            }
            OpI::RetainEven => {
                sut.retain(|_, v| *v % 2 == 0);
                model.retain(|(_, v)| *v % 2 == 0);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::Iterate => {
                let fwd: Vec<(String, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&fwd, &model);
                let mut back: Vec<(String, i32)> =
                    sut.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
                back.reverse();
                prop_assert_eq!(&back, &model);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.iter().len(), model.len());
        prop_assert_eq!(sut.front().map(|(k, _)| k), model.first().map(|(k, _)| k));
        prop_assert_eq!(sut.back().map(|(k, _)| k), model.last().map(|(k, _)| k));
    }

    let drained: Vec<(String, i32)> = sut.into_iter().collect();
    prop_assert_eq!(drained, model);
    Ok(())
}

// Property: State-machine equivalence against an insertion-ordered Vec.
// Invariants exercised across random operation sequences:
// - Replacing a key returns the old value and never moves the entry.
// - `get`/`contains_key`/`get_mut` parity with the model.
// - Removal returns the owned `(K, V)` and keeps the order of survivors.
// - `iter` (both directions) and `into_iter` follow first-insertion order.
// - `len`/`is_empty`/`front`/`back` parity with the model after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_ops(new_map(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher). This stresses equality checks
// and unlinking from a single crowded bucket chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_ops(OrderedHashMap::with_capacity_and_hasher(0, ConstBuildHasher), &pool, ops)?;
    }
}
