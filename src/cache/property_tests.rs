//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store and key derivation against arbitrary
//! operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::{estimate_size, full_key, stable_key, Cache, CacheStore, CallArgs};
use crate::memo::Memoizer;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 16;
const TEST_MAX_SIZE: usize = 4096;
const TEST_TTL: u64 = 300;

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,12}"
}

fn prefix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("price".to_string()),
        Just("metadata".to_string()),
        Just("history".to_string()),
    ]
}

/// Generates JSON values of modest, varied size.
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,64}".prop_map(Value::String),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, prefix: String, value: Value },
    Get { key: String, prefix: String },
    Delete { key: String, prefix: String },
    ClearPrefix { prefix: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), prefix_strategy(), value_strategy())
            .prop_map(|(key, prefix, value)| CacheOp::Set { key, prefix, value }),
        4 => (key_strategy(), prefix_strategy())
            .prop_map(|(key, prefix)| CacheOp::Get { key, prefix }),
        1 => (key_strategy(), prefix_strategy())
            .prop_map(|(key, prefix)| CacheOp::Delete { key, prefix }),
        1 => prefix_strategy().prop_map(|prefix| CacheOp::ClearPrefix { prefix }),
    ]
}

fn apply(store: &mut CacheStore, op: &CacheOp) -> Option<bool> {
    match op {
        CacheOp::Set { key, prefix, value } => {
            store.set(key, value.clone(), TEST_TTL, prefix).unwrap();
            None
        }
        CacheOp::Get { key, prefix } => Some(store.get(key, prefix).is_some()),
        CacheOp::Delete { key, prefix } => {
            store.delete(key, prefix);
            None
        }
        CacheOp::ClearPrefix { prefix } => {
            store.clear_by_prefix(prefix);
            None
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every get is exactly one hit or one miss
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_SIZE).unwrap();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in &ops {
            match apply(&mut store, op) {
                Some(true) => expected_hits += 1,
                Some(false) => expected_misses += 1,
                None => {}
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.entries, store.len(), "Entry count mismatch");
    }

    // Neither bound is exceeded after any operation, and the running size
    // always equals the sum of live entries
    #[test]
    fn prop_bounds_hold(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_SIZE).unwrap();
        let mut last_values: HashMap<String, Value> = HashMap::new();

        for op in &ops {
            if let CacheOp::Set { key, prefix, value } = op {
                last_values.insert(full_key(key, prefix), value.clone());
            }
            apply(&mut store, op);

            prop_assert!(store.len() <= TEST_MAX_ENTRIES);
            prop_assert!(store.size_bytes() <= TEST_MAX_SIZE);
        }

        let summed: usize = store
            .keys(None)
            .iter()
            .map(|key| estimate_size(&last_values[key]))
            .sum();
        prop_assert_eq!(store.size_bytes(), summed);
    }

    // A value stored and read back before expiry is unchanged
    #[test]
    fn prop_roundtrip_storage(
        key in key_strategy(),
        prefix in prefix_strategy(),
        value in value_strategy()
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_SIZE).unwrap();
        prop_assume!(estimate_size(&value) <= TEST_MAX_SIZE);

        store.set(&key, value.clone(), TEST_TTL, &prefix).unwrap();
        prop_assert_eq!(store.get(&key, &prefix), Some(value));
    }

    // Reads strictly before created_at + ttl hit; reads at or after miss
    #[test]
    fn prop_expiry_boundary(ttl in 1u64..10_000, offset_ms in 0u64..20_000_000) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_SIZE).unwrap();
        let start = Instant::now();
        store.set_at("k", json!("v"), ttl, "", start).unwrap();

        let read_at = start + Duration::from_millis(offset_ms);
        let live = offset_ms < ttl * 1000;

        prop_assert_eq!(store.exists_at("k", "", read_at), live);
        prop_assert_eq!(store.get_at("k", "", read_at).is_some(), live);
    }

    // Filling to capacity and inserting once more evicts the least recently
    // used key, and a read protects a key from being next
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::hash_set(key_strategy(), 3..8),
        access_index in any::<prop::sample::Index>(),
        new_key in key_strategy()
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        prop_assume!(!keys.contains(&new_key));

        let capacity = keys.len();
        let mut store = CacheStore::new(capacity, TEST_MAX_SIZE).unwrap();
        let start = Instant::now();

        for (i, key) in keys.iter().enumerate() {
            store.set_at(key, json!(i), TEST_TTL, "", start + Duration::from_millis(i as u64)).unwrap();
        }

        let accessed = access_index.index(capacity);
        let read_at = start + Duration::from_millis(capacity as u64);
        prop_assert!(store.get_at(&keys[accessed], "", read_at).is_some());

        let expected_evicted = if accessed == 0 { 1 } else { 0 };
        store
            .set_at(&new_key, json!("new"), TEST_TTL, "", read_at + Duration::from_millis(1))
            .unwrap();

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(!store.exists(&keys[expected_evicted], ""));
        prop_assert!(store.exists(&keys[accessed], ""));
        prop_assert!(store.exists(&new_key, ""));
        prop_assert_eq!(store.stats().evictions, 1);
    }

    // Clearing one prefix removes exactly its keys and leaves the rest
    #[test]
    fn prop_clear_by_prefix_isolation(
        entries in prop::collection::vec((key_strategy(), prefix_strategy()), 1..20),
        target in prefix_strategy()
    ) {
        prop_assume!(!target.is_empty());
        let mut store = CacheStore::new(64, TEST_MAX_SIZE).unwrap();

        let mut expected_removed = HashSet::new();
        let mut expected_kept = HashSet::new();
        for (key, prefix) in &entries {
            store.set(key, json!(1), TEST_TTL, prefix).unwrap();
            let full = full_key(key, prefix);
            if prefix == &target {
                expected_removed.insert(full);
            } else {
                expected_kept.insert(full);
            }
        }

        let removed = store.clear_by_prefix(&target);

        prop_assert_eq!(removed, expected_removed.len());
        prop_assert!(store.keys(Some(&target)).is_empty());
        let remaining: HashSet<String> = store.keys(None).into_iter().collect();
        prop_assert_eq!(remaining, expected_kept);
    }

    // Keyword argument order never changes the derived key
    #[test]
    fn prop_kwarg_order_independence(
        kwargs in prop::collection::btree_map("[a-z]{1,8}", value_strategy(), 0..6),
        positional in prop::collection::vec(value_strategy(), 0..3)
    ) {
        let forward = kwargs
            .iter()
            .fold(CallArgs::new(), |args, (name, value)| args.kwarg(name.clone(), value.clone()));
        let reverse = kwargs
            .iter()
            .rev()
            .fold(CallArgs::new(), |args, (name, value)| args.kwarg(name.clone(), value.clone()));

        let forward = positional.iter().fold(forward, |args, value| args.arg(value.clone()));
        let reverse = positional.iter().fold(reverse, |args, value| args.arg(value.clone()));

        prop_assert_eq!(
            stable_key(Some("fetch"), &forward),
            stable_key(Some("fetch"), &reverse)
        );
    }

    // A second call with equal arguments never reaches the producer
    #[test]
    fn prop_memoizer_calls_producer_once(id in any::<u32>(), repeats in 2usize..6) {
        let cache = Cache::new(TEST_MAX_ENTRIES, TEST_MAX_SIZE).unwrap();
        let memo = Memoizer::new(cache.clone(), TEST_TTL, "price").unwrap();
        let mut calls = 0u32;

        for _ in 0..repeats {
            let value: u32 = tokio_test::block_on(memo.call(CallArgs::new().arg(id), |args| {
                calls += 1;
                let id = args.get(0).and_then(Value::as_u64).unwrap_or_default() as u32;
                async move { Ok::<_, std::convert::Infallible>(id.wrapping_mul(3)) }
            }))
            .unwrap();
            prop_assert_eq!(value, id.wrapping_mul(3));
        }

        prop_assert_eq!(calls, 1);
        prop_assert_eq!(cache.stats().hits, (repeats - 1) as u64);
    }
}
