//! In-memory store for tests, DST and benchmarks
//!
//! Holds a Redis-like keyspace behind a single `RwLock`, so every command is
//! atomic on its own exactly as the bucket registry expects from a real
//! store. Clones share the same keyspace.

use super::data::{MemberSet, ScoredSet, Value};
use super::{StatsStore, StoreError, StoreResult};
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-command call counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub zadd_calls: u64,
    pub zrem_calls: u64,
    pub zrange_calls: u64,
    pub sadd_calls: u64,
    pub smembers_calls: u64,
    pub mget_calls: u64,
    /// Keys requested across all MGET calls
    pub mget_keys: u64,
    /// Largest single MGET request
    pub max_mget_batch: u64,
}

impl CommandStats {
    pub fn total_calls(&self) -> u64 {
        self.zadd_calls
            + self.zrem_calls
            + self.zrange_calls
            + self.sadd_calls
            + self.smembers_calls
            + self.mget_calls
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<AHashMap<String, Value>>>,
    stats: Arc<Mutex<CommandStats>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with `StoreError::Unavailable`
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn stats(&self) -> CommandStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = CommandStats::default();
    }

    /// SET key value, replacing whatever the key held.
    pub fn set(&self, key: &str, value: impl Into<String>) -> StoreResult<()> {
        self.check_available("SET")?;
        self.data
            .write()
            .insert(key.to_string(), Value::String(value.into()));
        Ok(())
    }

    /// GET key
    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available("GET")?;
        match self.data.read().get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    /// INCRBY key delta, the way aggregators bump stats counters.
    pub fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.check_available("INCRBY")?;
        let mut data = self.data.write();
        let current = match data.get(key) {
            None => 0,
            Some(Value::String(s)) => s.parse::<i64>().map_err(|_| {
                StoreError::Command("ERR value is not an integer or out of range".to_string())
            })?,
            Some(_) => return Err(wrong_type(key)),
        };
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::Command("ERR increment or decrement would overflow".to_string())
        })?;
        data.insert(key.to_string(), Value::String(next.to_string()));
        Ok(next)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Number of keys in the keyspace
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }

    fn check_available(&self, command: &str) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "{} rejected: connection refused",
                command
            )));
        }
        Ok(())
    }

    fn record(&self, f: impl FnOnce(&mut CommandStats)) {
        f(&mut *self.stats.lock());
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
    }
}

impl StatsStore for InMemoryStore {
    fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<bool> {
        self.record(|s| s.zadd_calls += 1);
        self.check_available("ZADD")?;
        if score.is_nan() {
            return Err(StoreError::Command(
                "ERR value is not a valid float".to_string(),
            ));
        }
        let mut data = self.data.write();
        let value = data
            .entry(key.to_string())
            .or_insert_with(|| Value::SortedSet(ScoredSet::new()));
        match value {
            Value::SortedSet(zs) => Ok(zs.add(member, score)),
            _ => Err(wrong_type(key)),
        }
    }

    fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.record(|s| s.zrem_calls += 1);
        self.check_available("ZREM")?;
        let mut data = self.data.write();
        let (removed, now_empty) = match data.get_mut(key) {
            None => return Ok(false),
            Some(Value::SortedSet(zs)) => {
                let removed = zs.remove(member);
                (removed, zs.is_empty())
            }
            Some(_) => return Err(wrong_type(key)),
        };
        // Redis drops a sorted set once its last member goes
        if now_empty {
            data.remove(key);
        }
        Ok(removed)
    }

    fn zrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        self.record(|s| s.zrange_calls += 1);
        self.check_available("ZRANGE")?;
        match self.data.read().get(key) {
            None => Ok(Vec::new()),
            Some(Value::SortedSet(zs)) => Ok(zs.range(0, -1)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.record(|s| s.sadd_calls += 1);
        self.check_available("SADD")?;
        let mut data = self.data.write();
        let value = data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(MemberSet::new()));
        match value {
            Value::Set(set) => Ok(set.add(member)),
            _ => Err(wrong_type(key)),
        }
    }

    fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.record(|s| s.smembers_calls += 1);
        self.check_available("SMEMBERS")?;
        match self.data.read().get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.members()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        self.record(|s| {
            s.mget_calls += 1;
            s.mget_keys += keys.len() as u64;
            s.max_mget_batch = s.max_mget_batch.max(keys.len() as u64);
        });
        self.check_available("MGET")?;
        if keys.is_empty() {
            return Err(StoreError::Command(
                "ERR wrong number of arguments for 'mget' command".to_string(),
            ));
        }
        let data = self.data.read();
        // MGET never fails on type: non-string keys read as nil
        Ok(keys
            .iter()
            .map(|key| data.get(key).and_then(Value::as_string).map(str::to_string))
            .collect())
    }
}
