//! Redis-backed store
//!
//! One synchronous connection, shared behind a mutex. Every trait method
//! issues exactly one Redis command; failures come back as `StoreError`
//! without retrying.

use super::{StatsStore, StoreError, StoreResult};
use parking_lot::Mutex;
use redis::{Client, Cmd, Connection, FromRedisValue, RedisError};
use tracing::{debug, warn};

pub struct RedisStore {
    connection: Mutex<Connection>,
    url: String,
}

impl RedisStore {
    /// Open a connection to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid Redis URL {}: {}", url, e)))?;
        let connection = client.get_connection().map_err(StoreError::from)?;
        debug!(url, "connected to Redis");
        Ok(RedisStore {
            connection: Mutex::new(connection),
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn query<T: FromRedisValue>(&self, cmd: &Cmd, key: &str) -> StoreResult<T> {
        let mut connection = self.connection.lock();
        cmd.query(&mut *connection).map_err(|e| {
            warn!(key, error = %e, "Redis command failed");
            if e.code() == Some("WRONGTYPE") {
                StoreError::WrongType {
                    key: key.to_string(),
                }
            } else {
                StoreError::from(e)
            }
        })
    }
}

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
        {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Command(e.to_string())
        }
    }
}

impl StatsStore for RedisStore {
    fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<bool> {
        let added: i64 = self.query(redis::cmd("ZADD").arg(key).arg(score).arg(member), key)?;
        Ok(added > 0)
    }

    fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let removed: i64 = self.query(redis::cmd("ZREM").arg(key).arg(member), key)?;
        Ok(removed > 0)
    }

    fn zrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        self.query(redis::cmd("ZRANGE").arg(key).arg(0).arg(-1), key)
    }

    fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        let added: i64 = self.query(redis::cmd("SADD").arg(key).arg(member), key)?;
        Ok(added > 0)
    }

    fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.query(redis::cmd("SMEMBERS").arg(key), key)
    }

    fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let first = keys.first().map(String::as_str).unwrap_or_default();
        let values: Vec<Option<String>> = self.query(redis::cmd("MGET").arg(keys), first)?;
        if values.len() != keys.len() {
            return Err(StoreError::InvalidReply(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }
        Ok(values)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish()
    }
}
