//! Changed-keys buckets
//!
//! Time is sliced into fixed intervals. Each interval gets a bucket, and
//! every stats key that changes during the interval is recorded into it:
//!
//! ```text
//! keys_changed_set              sorted set: open buckets, scored by id
//! keys_changed:<bucket_id>      set: stats keys changed in that bucket
//! ```
//!
//! `BucketStorage` composes the registry (`BucketIndex`) and the per-bucket
//! sets (`BucketMembership`) over one `StatsStore`.

pub mod dst;
mod id;
mod index;
pub mod keys;
mod membership;
mod storage;

pub use dst::{
    run_bucket_batch, summarize_bucket_batch, BucketDSTConfig, BucketDSTHarness, BucketDSTResult,
};
pub use id::{BucketId, BucketIdError, DEFAULT_BUCKET_INTERVAL, MAX_BUCKET_ID_LEN};
pub use index::BucketIndex;
pub use membership::BucketMembership;
pub use storage::{BucketStorage, DEFAULT_MGET_BATCH_SIZE};
