//! Store keys owned by the bucket registry

use super::BucketId;

const CHANGED_KEYS_SET: &str = "keys_changed_set";
const CHANGED_KEYS_BUCKET_PREFIX: &str = "keys_changed:";

/// Sorted set holding every open bucket.
pub fn changed_keys_key() -> &'static str {
    CHANGED_KEYS_SET
}

/// Set holding the stats keys recorded into `bucket`.
pub fn changed_keys_bucket_key(bucket: &BucketId) -> String {
    format!("{}{}", CHANGED_KEYS_BUCKET_PREFIX, bucket)
}
