//! Model-based tests comparing the tree against `BTreeMap`, plus the large
//! insertion-flood scenarios.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bits::{BitBlock, Variant};
use crate::block::Block;
use crate::inflate::{bitwise_growth, byte_aligned_growth, BlockFactory, InflatableBlock};
use crate::slots::Slots;
use crate::tree::{DuplicateKey, TransposeTree};

/// A string-keyed map composed out of a [`TransposeTree`] and two
/// caller-owned slot arrays, the way library users are expected to build
/// one.
struct StringTree {
    tree: TransposeTree,
    keys: Slots<String>,
    values: Slots<String>,
}

impl StringTree {
    fn new() -> Self {
        Self::with_factory(bitwise_growth)
    }

    fn with_factory(factory: BlockFactory) -> Self {
        StringTree {
            tree: TransposeTree::with_factory(2, factory),
            keys: Slots::new(),
            values: Slots::new(),
        }
    }

    fn insert(&mut self, key: &str, value: &str) -> Result<(), DuplicateKey> {
        let slot = self.tree.insertion_point();
        self.keys.set(slot, key.to_string());
        self.values.set(slot, value.to_string());
        let keys = &self.keys;
        self.tree.insert(|a, b| keys[a].cmp(&keys[b]))
    }

    fn get(&self, key: &str) -> Option<&str> {
        let keys = &self.keys;
        self.tree
            .lookup(|index: usize| key.cmp(&keys[index]))
            .map(|index| self.values[index].as_str())
    }

    /// Upsert: update in place when the key exists, insert otherwise.
    fn put(&mut self, key: &str, value: &str) -> Option<String> {
        let keys = &self.keys;
        match self.tree.lookup(|index: usize| key.cmp(&keys[index])) {
            Some(index) => Some(std::mem::replace(
                &mut self.values[index],
                value.to_string(),
            )),
            None => {
                self.insert(key, value)
                    .expect("lookup found no node for this key");
                None
            }
        }
    }

    fn in_order_keys(&self) -> Vec<&str> {
        self.tree
            .indexes()
            .map(|index| self.keys[index].as_str())
            .collect()
    }
}

const NAMES: [(&str, &str); 4] = [
    ("Albert", "Einstein"),
    ("Michael", "Jordan"),
    ("Barack", "Obama"),
    ("Charles", "Darwin"),
];

fn both_factories() -> [BlockFactory; 2] {
    [bitwise_growth, byte_aligned_growth]
}

#[test]
fn test_names() {
    for factory in both_factories() {
        let mut tree = StringTree::with_factory(factory);
        for (first, surname) in NAMES {
            tree.insert(surname, first).unwrap();
        }
        for (first, surname) in NAMES {
            assert_eq!(tree.get(surname), Some(first));
        }
        assert_eq!(tree.get("Doyle"), None);
        assert_eq!(
            tree.in_order_keys(),
            ["Darwin", "Einstein", "Jordan", "Obama"]
        );
        tree.tree.check_red_black();
    }
}

/// Just enough entries to inflate the child arrays past a byte.
const FLOOD_ENTRIES: usize = 35_000;

fn flood_with(factory: BlockFactory, numbers: Vec<i64>) {
    let mut tree = StringTree::with_factory(factory);
    for &number in &numbers {
        tree.put(&number.to_string(), &format!("{:x}", number));
    }

    for &number in &numbers {
        let hex = format!("{:x}", number);
        assert_eq!(tree.get(&number.to_string()), Some(hex.as_str()));
    }
    assert_eq!(tree.get("Huh?"), None);

    let distinct: BTreeSet<String> = numbers.iter().map(|number| number.to_string()).collect();
    assert_eq!(tree.tree.population(), distinct.len());
    let expected: Vec<&str> = distinct.iter().map(String::as_str).collect();
    assert_eq!(tree.in_order_keys(), expected);
    tree.tree.check_red_black();

    let (left, right) = tree.tree.child_storage();
    for storage in [left, right] {
        assert!(
            storage.bits_per_entry() > 8,
            "child arrays should have inflated past 8 bits, found {}",
            storage.bits_per_entry()
        );
    }
}

#[test]
fn test_numbers_in_order() {
    for factory in both_factories() {
        flood_with(
            factory,
            (1_000_000..1_000_000 + FLOOD_ENTRIES as i64).collect(),
        );
    }
}

#[test]
fn test_ordered_flood_spot_check() {
    let mut tree = StringTree::new();
    for number in 1_000_000..1_000_000 + FLOOD_ENTRIES as i64 {
        tree.put(&number.to_string(), &format!("{:x}", number));
    }
    assert_eq!(tree.get("1000000"), Some("f4240"));
    assert_eq!(tree.get("1034999"), Some("fcaf7"));
}

#[test]
fn test_random_numbers() {
    let mut random = StdRng::seed_from_u64(123);
    let numbers: Vec<i64> = (0..FLOOD_ENTRIES)
        .map(|_| random.gen_range(0..999_999_999))
        .collect();
    for factory in both_factories() {
        flood_with(factory, numbers.clone());
    }
}

#[derive(Debug, Clone)]
struct Key(String);

impl Arbitrary for Key {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: ()) -> Self::Strategy {
        prop_oneof![
            // Small decimal keys collide often, exercising the upsert path.
            (0u32..100).prop_map(|number| Key(number.to_string())),
            "[a-z]{1,8}".prop_map(Key),
            "[A-Z][a-z]{1,6}".prop_map(Key),
            Just(Key(String::new())),
        ]
        .boxed()
    }
}

#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Put(Key, Key),
    Get(Key),
}

struct Comparison {
    tree: StringTree,
    model: BTreeMap<String, String>,
}

impl Comparison {
    fn new() -> Self {
        Comparison {
            tree: StringTree::new(),
            model: BTreeMap::new(),
        }
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::Put(Key(key), Key(value)) => {
                let from_tree = self.tree.put(&key, &value);
                let from_model = self.model.insert(key.clone(), value);
                assert_eq!(from_tree, from_model, "put mismatch for key {:?}", key);
            }
            Action::Get(Key(key)) => {
                let from_tree = self.tree.get(&key);
                let from_model = self.model.get(&key).map(String::as_str);
                assert_eq!(from_tree, from_model, "get mismatch for key {:?}", key);
            }
        }
        assert_eq!(self.tree.tree.population(), self.model.len());
    }

    fn check_order(&self) {
        let expected: Vec<&str> = self.model.keys().map(String::as_str).collect();
        assert_eq!(self.tree.in_order_keys(), expected);
        self.tree.tree.check_red_black();
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_tree_vs_btreemap(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut comparison = Comparison::new();
        for action in actions {
            comparison.execute(action);
        }
        comparison.check_order();
    }

    #[test]
    fn proptest_inflatable_block_vs_vec(
        appends in prop::collection::vec(any::<i64>(), 1..100),
        overwrites in prop::collection::vec((any::<prop::sample::Index>(), any::<i64>()), 0..50),
    ) {
        let mut block = InflatableBlock::new(1);
        let mut model: Vec<i64> = Vec::new();
        for value in appends {
            block.add(value);
            model.push(value);
        }
        for (position, value) in overwrites {
            let index = position.index(model.len());
            block.set(index, value);
            model[index] = value;
        }
        prop_assert_eq!(block.len(), model.len());
        for (index, expected) in model.iter().enumerate() {
            prop_assert_eq!(block.get(index), *expected);
        }
    }

    #[test]
    fn proptest_bitblock_round_trip_and_snug(
        entry_bits in 1u32..=32,
        variant in prop_oneof![
            Just(Variant::Unsigned),
            Just(Variant::Signed),
            Just(Variant::UnsignedOrNull),
        ],
        raw_values in prop::collection::vec(any::<u32>(), 1..200),
    ) {
        let mut block = BitBlock::new(variant, entry_bits, 8);
        let lower = block.lower_limit();
        let span = block.upper_limit() - lower + 1;
        let mut model = Vec::new();
        for raw in raw_values {
            let value = lower + raw as i64 % span;
            prop_assert!(block.is_valid(value));
            block.add(value).unwrap();
            model.push(value);
        }
        for (index, expected) in model.iter().enumerate() {
            prop_assert_eq!(block.get(index), *expected);
        }

        let snugged = block.snug(0);
        prop_assert!(snugged.bits_per_entry() <= entry_bits);
        prop_assert_eq!(snugged.len(), model.len());
        for (index, expected) in model.iter().enumerate() {
            prop_assert_eq!(snugged.get(index), *expected);
        }
    }
}
