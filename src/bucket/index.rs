//! Ordered registry of open buckets

use super::keys::changed_keys_key;
use super::BucketId;
use crate::store::{StatsStore, StoreError, StoreResult};
use std::sync::Arc;

#[derive(Debug)]
pub struct BucketIndex<S> {
    store: Arc<S>,
}

impl<S: StatsStore> BucketIndex<S> {
    pub fn new(store: Arc<S>) -> Self {
        BucketIndex { store }
    }

    /// Register `bucket`, scored by its own value. Returns true if it was
    /// not registered yet.
    pub fn insert(&self, bucket: &BucketId) -> StoreResult<bool> {
        self.store
            .zadd(changed_keys_key(), bucket.as_str(), bucket.score())
    }

    /// Returns true if `bucket` was registered.
    pub fn remove(&self, bucket: &BucketId) -> StoreResult<bool> {
        self.store.zrem(changed_keys_key(), bucket.as_str())
    }

    /// Every registered bucket, ascending.
    pub fn all(&self) -> StoreResult<Vec<BucketId>> {
        self.store
            .zrange_all(changed_keys_key())?
            .into_iter()
            .map(|member| {
                BucketId::new(member.as_str()).map_err(|e| {
                    StoreError::InvalidReply(format!(
                        "registry member {:?} is not a bucket id: {}",
                        member, e
                    ))
                })
            })
            .collect()
    }

    /// Reads the whole registry; O(buckets) per call.
    pub fn contains(&self, bucket: &BucketId) -> StoreResult<bool> {
        Ok(self.all()?.contains(bucket))
    }
}

impl<S> Clone for BucketIndex<S> {
    fn clone(&self) -> Self {
        BucketIndex {
            store: Arc::clone(&self.store),
        }
    }
}
