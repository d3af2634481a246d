//! Key-Value Store Boundary
//!
//! The bucket registry only ever talks to its store through the handful of
//! commands in [`StatsStore`]. Each method is one round trip and is atomic
//! on its own; nothing here spans commands.
//!
//! Implementations:
//! - `InMemoryStore`: For unit tests, DST and benchmarks
//! - `RedisStore`: For production, over a Redis connection

pub mod data;
pub mod memory;
pub mod redis_store;

pub use memory::{CommandStats, InMemoryStore};
pub use redis_store::RedisStore;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Store unreachable or connection lost
    Unavailable(String),
    /// Store rejected the command
    Command(String),
    /// Key holds a value of the wrong type for the command
    WrongType { key: String },
    /// Store answered with something the caller cannot interpret
    InvalidReply(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::Command(msg) => write!(f, "Store command failed: {}", msg),
            StoreError::WrongType { key } => write!(
                f,
                "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
                key
            ),
            StoreError::InvalidReply(msg) => write!(f, "Invalid store reply: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Command surface consumed by the bucket registry.
pub trait StatsStore: Send + Sync {
    /// ZADD key score member. Returns true if the member is new.
    fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<bool>;

    /// ZREM key member. Returns true if the member was present.
    fn zrem(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// ZRANGE key 0 -1, ascending by score.
    fn zrange_all(&self, key: &str) -> StoreResult<Vec<String>>;

    /// SADD key member. Returns true if the member is new.
    fn sadd(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// SMEMBERS key. Empty when the key does not exist.
    fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    /// MGET keys. One entry per requested key, in request order.
    fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;
}
