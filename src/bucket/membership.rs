//! Per-bucket sets of changed stats keys

use super::keys::changed_keys_bucket_key;
use super::BucketId;
use crate::store::{StatsStore, StoreResult};
use std::sync::Arc;

#[derive(Debug)]
pub struct BucketMembership<S> {
    store: Arc<S>,
}

impl<S: StatsStore> BucketMembership<S> {
    pub fn new(store: Arc<S>) -> Self {
        BucketMembership { store }
    }

    /// Returns true if `event_key` was not in the bucket yet.
    pub fn add(&self, bucket: &BucketId, event_key: &str) -> StoreResult<bool> {
        self.store.sadd(&changed_keys_bucket_key(bucket), event_key)
    }

    /// Unordered; empty if nothing was ever recorded.
    pub fn members(&self, bucket: &BucketId) -> StoreResult<Vec<String>> {
        self.store.smembers(&changed_keys_bucket_key(bucket))
    }
}

impl<S> Clone for BucketMembership<S> {
    fn clone(&self) -> Self {
        BucketMembership {
            store: Arc::clone(&self.store),
        }
    }
}
