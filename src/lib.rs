pub mod bucket;
pub mod config;
pub mod store;

pub use bucket::{BucketId, BucketIdError, BucketStorage};
pub use config::{BucketStorageConfig, ConfigError};
pub use store::{InMemoryStore, RedisStore, StatsStore, StoreError, StoreResult};
