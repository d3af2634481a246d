//! Bucket Storage
//!
//! Buckets are opened every few seconds (10 by default). While a bucket is
//! open, every stats key that changes is recorded into it; a drain later
//! walks the buckets in order, reads each one's keys together with their
//! current values, and deletes the bucket once those have been persisted.

use super::index::BucketIndex;
use super::membership::BucketMembership;
use super::BucketId;
use crate::config::{BucketStorageConfig, ConfigError};
use crate::store::{StatsStore, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace};

/// Keys per MGET when reading bucket values.
pub const DEFAULT_MGET_BATCH_SIZE: usize = 200;

/// Registry of open buckets and the stats keys recorded into each.
///
/// - `put_in_bucket` returns `Ok(true)` when the bucket was open and the key
///   is now recorded in it, whether or not it was recorded before, and
///   `Ok(false)` when the bucket is not open.
/// - The open-check and the insert are two round trips: a `delete_bucket`
///   landing in between lets a key into a bucket that is already closed.
/// - `delete_bucket` only closes the bucket. Its recorded keys stay in the
///   store and remain readable through `bucket_content`.
/// - Store failures are returned unchanged; nothing is retried.
pub struct BucketStorage<S> {
    store: Arc<S>,
    index: BucketIndex<S>,
    membership: BucketMembership<S>,
    mget_batch_size: NonZeroUsize,
}

impl<S: StatsStore> BucketStorage<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Share a store that other components also write through.
    pub fn from_arc(store: Arc<S>) -> Self {
        BucketStorage {
            index: BucketIndex::new(Arc::clone(&store)),
            membership: BucketMembership::new(Arc::clone(&store)),
            store,
            mget_batch_size: NonZeroUsize::new(DEFAULT_MGET_BATCH_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Fails on a config that does not validate (e.g. a zero batch size).
    pub fn from_config(store: S, config: &BucketStorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let size = NonZeroUsize::new(config.mget_batch_size).ok_or_else(|| {
            ConfigError::Invalid("mget_batch_size must be greater than 0".to_string())
        })?;
        Ok(Self::new(store).with_mget_batch_size(size))
    }

    pub fn with_mget_batch_size(mut self, size: NonZeroUsize) -> Self {
        self.mget_batch_size = size;
        self
    }

    pub fn mget_batch_size(&self) -> usize {
        self.mget_batch_size.get()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_bucket(&self, bucket: &BucketId) -> StoreResult<()> {
        let added = self.index.insert(bucket)?;
        debug!(bucket = %bucket, added, "created bucket");
        Ok(())
    }

    pub fn delete_bucket(&self, bucket: &BucketId) -> StoreResult<()> {
        let removed = self.index.remove(bucket)?;
        debug!(bucket = %bucket, removed, "deleted bucket");
        Ok(())
    }

    /// Every open bucket, oldest first.
    pub fn all_buckets(&self) -> StoreResult<Vec<BucketId>> {
        self.index.all()
    }

    /// Record `event_key` as changed during `bucket`.
    ///
    /// `Ok(true)`: the bucket is open and the key is recorded in it (also
    /// when it already was). `Ok(false)`: the bucket is not open and
    /// nothing was written. The open-check reads the whole registry and is
    /// not atomic with the insert.
    pub fn put_in_bucket(&self, event_key: &str, bucket: &BucketId) -> StoreResult<bool> {
        if !self.index.contains(bucket)? {
            debug!(bucket = %bucket, event_key, "bucket not open, key not recorded");
            return Ok(false);
        }
        let added = self.membership.add(bucket, event_key)?;
        trace!(bucket = %bucket, event_key, added, "recorded changed key");
        Ok(true)
    }

    /// Stats keys recorded into `bucket`, in no particular order.
    pub fn bucket_content(&self, bucket: &BucketId) -> StoreResult<Vec<String>> {
        self.membership.members(bucket)
    }

    /// Stats keys recorded into `bucket` with their current values. Keys
    /// whose value is gone map to `None`.
    pub fn bucket_content_with_values(
        &self,
        bucket: &BucketId,
    ) -> StoreResult<BTreeMap<String, Option<String>>> {
        let event_keys = self.bucket_content(bucket)?;

        let mut event_values = Vec::with_capacity(event_keys.len());
        for (i, slice) in event_keys.chunks(self.mget_batch_size.get()).enumerate() {
            trace!(bucket = %bucket, chunk = i, keys = slice.len(), "MGET bucket values");
            let values = self.store.mget(slice)?;
            if values.len() != slice.len() {
                return Err(StoreError::InvalidReply(format!(
                    "MGET returned {} values for {} keys of bucket {}",
                    values.len(),
                    slice.len(),
                    bucket
                )));
            }
            event_values.extend(values);
        }

        debug!(bucket = %bucket, keys = event_keys.len(), "read bucket content");

        Ok(event_keys.into_iter().zip(event_values).collect())
    }
}

impl<S> Clone for BucketStorage<S> {
    fn clone(&self) -> Self {
        BucketStorage {
            store: Arc::clone(&self.store),
            index: self.index.clone(),
            membership: self.membership.clone(),
            mget_batch_size: self.mget_batch_size,
        }
    }
}
