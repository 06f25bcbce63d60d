//! Property tests: the tree against a `BTreeMap` model.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use leafline::buffer::BufferPoolManager;
use leafline::common::{Datatype, Operator, PageId, RecordId};
use leafline::index::btree::{BTreeIndex, NodeLayout};
use leafline::relation::MemoryRelation;
use leafline::IndexConfig;
use proptest::prelude::*;
use tempfile::{tempdir, TempDir};

fn empty_index(leaf: usize, internal: usize) -> (BTreeIndex, TempDir) {
    let dir = tempdir().unwrap();
    let config = IndexConfig::default()
        .with_data_dir(dir.path())
        .with_layout(NodeLayout::new(leaf, internal).unwrap());
    let bpm = Arc::new(BufferPoolManager::new(256));
    let index = BTreeIndex::open_or_create(
        bpm,
        &config,
        &MemoryRelation::new("prop"),
        0,
        Datatype::Integer,
    )
    .unwrap();
    (index, dir)
}

/// Distinct keys in generation order.
fn distinct_keys() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-2000i32..2000, 0..250).prop_map(|keys| {
        let mut seen = HashSet::new();
        keys.into_iter().filter(|k| seen.insert(*k)).collect()
    })
}

/// Keys from a narrow range, so most values repeat across many leaves.
fn repeated_keys() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(0i32..30, 0..300)
}

fn low_op() -> impl Strategy<Value = Operator> {
    prop_oneof![Just(Operator::Gt), Just(Operator::Gte)]
}

fn high_op() -> impl Strategy<Value = Operator> {
    prop_oneof![Just(Operator::Lt), Just(Operator::Lte)]
}

fn build(keys: &[i32], leaf: usize, internal: usize) -> (BTreeIndex, BTreeMap<i32, RecordId>, TempDir) {
    let (mut index, dir) = empty_index(leaf, internal);
    let mut model = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        let rid = RecordId::new(PageId::new(i as u32), (i % 5) as u16);
        index.insert_entry(*key, rid).unwrap();
        model.insert(*key, rid);
    }
    (index, model, dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Following sibling pointers visits every key once, in order.
    #[test]
    fn prop_leaf_chain_is_sorted_and_complete(
        keys in distinct_keys(),
        leaf in 2usize..6,
        internal in 2usize..5,
    ) {
        let (index, model, _dir) = build(&keys, leaf, internal);

        let chain = index.leaf_chain().unwrap();
        for node in &chain {
            prop_assert!(node.len() <= leaf);
        }
        let flattened: Vec<i32> = chain.concat();
        let expected: Vec<i32> = model.keys().copied().collect();
        prop_assert_eq!(flattened, expected);
    }

    /// A scan returns exactly the model's entries inside the interval.
    #[test]
    fn prop_scan_matches_model(
        keys in distinct_keys(),
        leaf in 2usize..6,
        internal in 2usize..5,
        a in -2100i32..2100,
        b in -2100i32..2100,
        lo_op in low_op(),
        hi_op in high_op(),
    ) {
        let (mut index, model, _dir) = build(&keys, leaf, internal);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let got = index.scan_range(low, lo_op, high, hi_op).unwrap();
        let expected: Vec<RecordId> = model
            .iter()
            .filter(|(k, _)| lo_op.admits(**k, low) && hi_op.admits(**k, high))
            .map(|(_, rid)| *rid)
            .collect();
        prop_assert_eq!(got, expected);
    }

    /// With heavy duplication the chain stays sorted, and a scan just
    /// above the previous value finds every copy of a key.
    #[test]
    fn prop_duplicates_stay_ordered_and_countable(
        keys in repeated_keys(),
        leaf in 2usize..6,
        internal in 2usize..5,
    ) {
        let (mut index, _dir) = empty_index(leaf, internal);
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            index.insert_entry(*key, RecordId::new(PageId::new(i as u32), 0)).unwrap();
            *counts.entry(*key).or_default() += 1;
        }

        let flattened: Vec<i32> = index.leaf_chain().unwrap().concat();
        prop_assert_eq!(flattened.len(), keys.len());
        prop_assert!(flattened.windows(2).all(|w| w[0] <= w[1]));

        for k in 0..30 {
            let got = index.scan_range(k - 1, Operator::Gt, k, Operator::Lte).unwrap();
            prop_assert_eq!(got.len(), counts.get(&k).copied().unwrap_or(0), "key {}", k);
        }
    }

    /// Every inserted entry is found by a point scan on its key.
    #[test]
    fn prop_every_entry_is_retrievable(keys in distinct_keys()) {
        let (mut index, model, _dir) = build(&keys, 3, 2);

        for (key, rid) in &model {
            let got = index.scan_range(*key, Operator::Gte, *key, Operator::Lte).unwrap();
            prop_assert_eq!(got, vec![*rid]);
        }
    }
}
