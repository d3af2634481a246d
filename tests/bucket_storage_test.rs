//! Bucket Storage Tests
//!
//! Registry, membership and batched-read behaviour of `BucketStorage`
//! against the in-memory store.

use stats_buckets::bucket::keys::changed_keys_bucket_key;
use stats_buckets::{BucketId, BucketStorage, InMemoryStore, StatsStore, StoreError};
use std::collections::{BTreeMap, HashSet};

fn bucket(id: &str) -> BucketId {
    BucketId::new(id).unwrap()
}

fn storage() -> BucketStorage<InMemoryStore> {
    BucketStorage::new(InMemoryStore::new())
}

fn content_set(storage: &BucketStorage<InMemoryStore>, b: &BucketId) -> HashSet<String> {
    storage.bucket_content(b).unwrap().into_iter().collect()
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_created_bucket_is_listed_until_deleted() {
    let storage = storage();
    let b = bucket("20140729182500");

    storage.create_bucket(&b).unwrap();
    assert!(storage.all_buckets().unwrap().contains(&b));

    storage.delete_bucket(&b).unwrap();
    assert!(!storage.all_buckets().unwrap().contains(&b));
}

#[test]
fn test_create_bucket_is_idempotent() {
    let storage = storage();
    let b = bucket("20140729182500");

    storage.create_bucket(&b).unwrap();
    storage.create_bucket(&b).unwrap();

    assert_eq!(storage.all_buckets().unwrap(), vec![b]);
}

#[test]
fn test_delete_missing_bucket_is_noop() {
    let storage = storage();
    let kept = bucket("20140729182500");
    storage.create_bucket(&kept).unwrap();

    storage.delete_bucket(&bucket("20140729182510")).unwrap();

    assert_eq!(storage.all_buckets().unwrap(), vec![kept]);
}

#[test]
fn test_empty_registry_lists_nothing() {
    let storage = storage();
    assert!(storage.all_buckets().unwrap().is_empty());
}

#[test]
fn test_all_buckets_ordered_regardless_of_creation_order() {
    let storage = storage();
    for id in ["20140729182530", "20140729182500", "20140729182520", "20140729182510"] {
        storage.create_bucket(&bucket(id)).unwrap();
    }

    let listed: Vec<String> = storage
        .all_buckets()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        listed,
        vec!["20140729182500", "20140729182510", "20140729182520", "20140729182530"]
    );
}

#[test]
fn test_buckets_order_numerically() {
    let storage = storage();
    storage.create_bucket(&bucket("900")).unwrap();
    storage.create_bucket(&bucket("1000")).unwrap();

    assert_eq!(
        storage.all_buckets().unwrap(),
        vec![bucket("900"), bucket("1000")]
    );
}

// =============================================================================
// Membership
// =============================================================================

#[test]
fn test_put_into_never_created_bucket_is_rejected() {
    let storage = storage();
    let b = bucket("20140729182500");

    assert!(!storage.put_in_bucket("k1", &b).unwrap());
    assert!(storage.bucket_content(&b).unwrap().is_empty());
}

#[test]
fn test_put_into_deleted_bucket_is_rejected() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    storage.put_in_bucket("k1", &b).unwrap();
    storage.delete_bucket(&b).unwrap();

    let before = content_set(&storage, &b);
    assert!(!storage.put_in_bucket("k2", &b).unwrap());
    assert_eq!(content_set(&storage, &b), before);
}

#[test]
fn test_put_into_open_bucket_is_recorded() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();

    assert!(storage.put_in_bucket("k1", &b).unwrap());
    assert!(storage.put_in_bucket("k2", &b).unwrap());

    let expected: HashSet<String> = ["k1", "k2"].iter().map(|s| s.to_string()).collect();
    assert_eq!(content_set(&storage, &b), expected);
}

#[test]
fn test_buckets_keep_separate_members() {
    let storage = storage();
    let first = bucket("20140729182500");
    let second = bucket("20140729182510");
    storage.create_bucket(&first).unwrap();
    storage.create_bucket(&second).unwrap();

    storage.put_in_bucket("k1", &first).unwrap();
    storage.put_in_bucket("k2", &second).unwrap();

    assert_eq!(storage.bucket_content(&first).unwrap(), vec!["k1"]);
    assert_eq!(storage.bucket_content(&second).unwrap(), vec!["k2"]);
}

#[test]
fn test_membership_survives_bucket_deletion() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    storage.put_in_bucket("k1", &b).unwrap();
    storage.store().set("k1", "3").unwrap();

    storage.delete_bucket(&b).unwrap();

    assert!(storage.store().exists(&changed_keys_bucket_key(&b)));
    assert_eq!(storage.bucket_content(&b).unwrap(), vec!["k1"]);
    let content = storage.bucket_content_with_values(&b).unwrap();
    assert_eq!(content.get("k1"), Some(&Some("3".to_string())));
}

// =============================================================================
// Content with values
// =============================================================================

#[test]
fn test_content_with_values_scenario() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    storage.put_in_bucket("k1", &b).unwrap();
    storage.put_in_bucket("k2", &b).unwrap();
    storage.store().set("k1", "5").unwrap();

    let content = storage.bucket_content_with_values(&b).unwrap();

    let expected: BTreeMap<String, Option<String>> = [
        ("k1".to_string(), Some("5".to_string())),
        ("k2".to_string(), None),
    ]
    .into_iter()
    .collect();
    assert_eq!(content, expected);
}

#[test]
fn test_content_with_values_matches_content_and_store() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    for i in 0..25 {
        let key = format!("stats/{{service:1000}}/metric:{}/eternity", i);
        storage.put_in_bucket(&key, &b).unwrap();
        if i % 3 != 0 {
            storage.store().incr_by(&key, i).unwrap();
        }
    }

    let content = storage.bucket_content_with_values(&b).unwrap();

    let keys: HashSet<String> = content.keys().cloned().collect();
    assert_eq!(keys, content_set(&storage, &b));
    for (key, value) in &content {
        assert_eq!(value, &storage.store().get(key).unwrap(), "value of {}", key);
    }
}

#[test]
fn test_values_are_read_at_drain_time() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    storage.store().incr_by("hits", 1).unwrap();
    storage.put_in_bucket("hits", &b).unwrap();
    storage.store().incr_by("hits", 4).unwrap();

    let content = storage.bucket_content_with_values(&b).unwrap();
    assert_eq!(content.get("hits"), Some(&Some("5".to_string())));
}

#[test]
fn test_unknown_bucket_content_is_empty() {
    let storage = storage();
    let b = bucket("20140729182500");

    assert!(storage.bucket_content(&b).unwrap().is_empty());
    assert!(storage.bucket_content_with_values(&b).unwrap().is_empty());
    assert_eq!(storage.store().stats().mget_calls, 0);
}

#[test]
fn test_mget_is_chunked_by_200() {
    for (n, expected_calls) in [(0, 0), (1, 1), (200, 1), (201, 2), (400, 2)] {
        let storage = storage();
        let b = bucket("20140729182500");
        storage.create_bucket(&b).unwrap();
        for i in 0..n {
            let key = format!("key:{}", i);
            storage.put_in_bucket(&key, &b).unwrap();
            storage.store().set(&key, i.to_string()).unwrap();
        }
        storage.store().reset_stats();

        let content = storage.bucket_content_with_values(&b).unwrap();

        let stats = storage.store().stats();
        assert_eq!(stats.mget_calls, expected_calls, "MGET calls for N={}", n);
        assert_eq!(stats.mget_keys, n as u64, "keys requested for N={}", n);
        assert!(stats.max_mget_batch <= 200, "batch size for N={}", n);
        assert_eq!(content.len(), n, "entries for N={}", n);
        assert!(content.values().all(Option::is_some));
    }
}

// =============================================================================
// Store failures
// =============================================================================

#[test]
fn test_store_outage_propagates_from_every_operation() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    storage.put_in_bucket("k1", &b).unwrap();
    storage.store().set_unavailable(true);

    let unavailable = |e: StoreError| matches!(e, StoreError::Unavailable(_));
    assert!(unavailable(storage.create_bucket(&b).unwrap_err()));
    assert!(unavailable(storage.delete_bucket(&b).unwrap_err()));
    assert!(unavailable(storage.all_buckets().unwrap_err()));
    assert!(unavailable(storage.put_in_bucket("k2", &b).unwrap_err()));
    assert!(unavailable(storage.bucket_content(&b).unwrap_err()));
    assert!(unavailable(storage.bucket_content_with_values(&b).unwrap_err()));

    storage.store().set_unavailable(false);
    assert_eq!(storage.all_buckets().unwrap(), vec![b.clone()]);
    assert_eq!(storage.bucket_content(&b).unwrap(), vec!["k1"]);
}

#[test]
fn test_stats_key_holding_a_set_reads_as_missing() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();
    storage.store().sadd("odd_key", "member").unwrap();
    storage.put_in_bucket("odd_key", &b).unwrap();

    let content = storage.bucket_content_with_values(&b).unwrap();
    assert_eq!(content.get("odd_key"), Some(&None));
}

// =============================================================================
// Concurrent writers
// =============================================================================

#[test]
fn test_concurrent_aggregators_share_a_bucket() {
    let storage = storage();
    let b = bucket("20140729182500");
    storage.create_bucket(&b).unwrap();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let storage = storage.clone();
            let b = b.clone();
            scope.spawn(move || {
                for i in 0..50 {
                    let key = format!("worker:{}:key:{}", worker, i);
                    assert!(storage.put_in_bucket(&key, &b).unwrap());
                }
            });
        }
    });

    assert_eq!(storage.bucket_content(&b).unwrap().len(), 200);
}
