//! Deterministic Simulation Testing for Bucket Storage
//!
//! Shadow-state harness that drives `BucketStorage` over an `InMemoryStore`
//! with seeded random aggregator and drain operations:
//! - Deterministic random operation generation
//! - Invariant checking after each operation
//! - Seed-based reproducibility for debugging

use super::{BucketId, BucketStorage, DEFAULT_BUCKET_INTERVAL};
use crate::store::InMemoryStore;
use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

fn first_bucket_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2014, 7, 29, 18, 25, 0)
        .single()
        .unwrap_or_default()
}

/// Configuration for bucket DST
#[derive(Debug, Clone)]
pub struct BucketDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of distinct bucket ids in play
    pub num_buckets: u64,
    /// Number of distinct stats keys in play
    pub num_keys: u64,
    /// Probability of deleting a bucket
    pub delete_prob: f64,
    /// Probability of draining (reading) a bucket
    pub drain_prob: f64,
    /// MGET chunk size
    pub mget_batch_size: usize,
}

impl Default for BucketDSTConfig {
    fn default() -> Self {
        BucketDSTConfig {
            seed: 0,
            num_buckets: 8,
            num_keys: 50,
            delete_prob: 0.1,
            drain_prob: 0.1,
            mget_batch_size: 200,
        }
    }
}

impl BucketDSTConfig {
    pub fn new(seed: u64) -> Self {
        BucketDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Buckets closed almost as fast as they open, lots of rejected puts
    pub fn high_churn(seed: u64) -> Self {
        BucketDSTConfig {
            seed,
            num_buckets: 4,
            num_keys: 20,
            delete_prob: 0.35,
            drain_prob: 0.15,
            mget_batch_size: 200,
        }
    }

    /// Tiny MGET chunks so every drain spans several round trips
    pub fn small_batches(seed: u64) -> Self {
        BucketDSTConfig {
            seed,
            num_buckets: 3,
            num_keys: 40,
            delete_prob: 0.05,
            drain_prob: 0.2,
            mget_batch_size: 3,
        }
    }
}

/// Operation type for logging
#[derive(Debug, Clone)]
pub enum BucketOp {
    Create { bucket: String },
    Delete { bucket: String },
    Put { key: String, bucket: String },
    SetValue { key: String },
    Drain { bucket: String },
}

/// Result of a bucket DST run
#[derive(Debug, Clone)]
pub struct BucketDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub creates: u64,
    pub deletes: u64,
    pub puts_recorded: u64,
    pub puts_rejected: u64,
    pub drains: u64,
    pub mget_calls: u64,
    pub invariant_violations: Vec<String>,
    pub last_op: Option<BucketOp>,
}

impl BucketDSTResult {
    pub fn new(seed: u64) -> Self {
        BucketDSTResult {
            seed,
            total_operations: 0,
            creates: 0,
            deletes: 0,
            puts_recorded: 0,
            puts_rejected: 0,
            drains: 0,
            mget_calls: 0,
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops (creates:{}, deletes:{}, recorded:{}, rejected:{}, drains:{}, mgets:{}), {} violations",
            self.seed,
            self.total_operations,
            self.creates,
            self.deletes,
            self.puts_recorded,
            self.puts_rejected,
            self.drains,
            self.mget_calls,
            self.invariant_violations.len()
        )
    }
}

/// DST harness for BucketStorage
pub struct BucketDSTHarness {
    config: BucketDSTConfig,
    rng: ChaCha8Rng,
    storage: BucketStorage<InMemoryStore>,
    result: BucketDSTResult,
    /// Buckets expected in the registry
    expected_open: BTreeSet<BucketId>,
    /// Keys expected per bucket; survives bucket deletion
    expected_members: HashMap<BucketId, HashSet<String>>,
    /// Stats values written so far
    expected_values: HashMap<String, String>,
}

impl BucketDSTHarness {
    pub fn new(config: BucketDSTConfig) -> Self {
        let storage = BucketStorage::new(InMemoryStore::new());
        let storage = match std::num::NonZeroUsize::new(config.mget_batch_size) {
            Some(size) => storage.with_mget_batch_size(size),
            None => storage,
        };
        BucketDSTHarness {
            result: BucketDSTResult::new(config.seed),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            storage,
            expected_open: BTreeSet::new(),
            expected_members: HashMap::new(),
            expected_values: HashMap::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(BucketDSTConfig::new(seed))
    }

    /// `None` (recorded as a violation) when the drawn offset has no valid
    /// bucket id, e.g. a `num_buckets` reaching past the representable years.
    fn random_bucket(&mut self) -> Option<BucketId> {
        let offset = self.rng.gen_range(0..self.config.num_buckets.max(1));
        let time = i64::try_from(offset)
            .ok()
            .and_then(|offset| offset.checked_mul(10))
            .and_then(|secs| first_bucket_time().timestamp().checked_add(secs))
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));
        let bucket = time.and_then(|time| BucketId::for_time(time, DEFAULT_BUCKET_INTERVAL).ok());
        if bucket.is_none() {
            self.violation(format!("no bucket id for offset {}", offset));
        }
        bucket
    }

    fn random_key(&mut self) -> String {
        let idx = self.rng.gen_range(0..self.config.num_keys.max(1));
        format!("stats/{{service:1000}}/metric:{}/eternity", idx)
    }

    fn violation(&mut self, msg: String) {
        self.result.invariant_violations.push(msg);
    }

    fn run_single_op(&mut self) {
        let roll: f64 = self.rng.gen();
        let delete_threshold = self.config.delete_prob;
        let drain_threshold = delete_threshold + self.config.drain_prob;

        if roll < delete_threshold {
            self.op_delete();
        } else if roll < drain_threshold {
            self.op_drain();
        } else {
            match self.rng.gen_range(0..4) {
                0 => self.op_create(),
                1 => self.op_set_value(),
                _ => self.op_put(),
            }
        }

        self.result.total_operations += 1;

        if let Err(violation) = self.check_invariants() {
            let msg = format!(
                "Op #{}: {:?} - {}",
                self.result.total_operations, self.result.last_op, violation
            );
            self.violation(msg);
        }
    }

    fn op_create(&mut self) {
        let Some(bucket) = self.random_bucket() else {
            return;
        };
        self.result.last_op = Some(BucketOp::Create {
            bucket: bucket.to_string(),
        });
        match self.storage.create_bucket(&bucket) {
            Ok(()) => {
                self.expected_open.insert(bucket);
                self.result.creates += 1;
            }
            Err(e) => self.violation(format!("create_bucket failed: {}", e)),
        }
    }

    fn op_delete(&mut self) {
        let Some(bucket) = self.random_bucket() else {
            return;
        };
        self.result.last_op = Some(BucketOp::Delete {
            bucket: bucket.to_string(),
        });
        match self.storage.delete_bucket(&bucket) {
            Ok(()) => {
                self.expected_open.remove(&bucket);
                self.result.deletes += 1;
            }
            Err(e) => self.violation(format!("delete_bucket failed: {}", e)),
        }
    }

    fn op_put(&mut self) {
        let Some(bucket) = self.random_bucket() else {
            return;
        };
        let key = self.random_key();
        self.result.last_op = Some(BucketOp::Put {
            key: key.clone(),
            bucket: bucket.to_string(),
        });

        let open = self.expected_open.contains(&bucket);
        match self.storage.put_in_bucket(&key, &bucket) {
            Ok(recorded) => {
                if recorded != open {
                    self.violation(format!(
                        "put_in_bucket returned {} for bucket open={}",
                        recorded, open
                    ));
                }
                if recorded {
                    self.expected_members.entry(bucket).or_default().insert(key);
                    self.result.puts_recorded += 1;
                } else {
                    self.result.puts_rejected += 1;
                }
            }
            Err(e) => self.violation(format!("put_in_bucket failed: {}", e)),
        }
    }

    fn op_set_value(&mut self) {
        let key = self.random_key();
        self.result.last_op = Some(BucketOp::SetValue { key: key.clone() });
        match self.storage.store().incr_by(&key, 1) {
            Ok(value) => {
                self.expected_values.insert(key, value.to_string());
            }
            Err(e) => self.violation(format!("incr_by failed: {}", e)),
        }
    }

    fn op_drain(&mut self) {
        let Some(bucket) = self.random_bucket() else {
            return;
        };
        self.result.last_op = Some(BucketOp::Drain {
            bucket: bucket.to_string(),
        });

        let before = self.storage.store().stats().mget_calls;
        let content = match self.storage.bucket_content_with_values(&bucket) {
            Ok(content) => content,
            Err(e) => {
                self.violation(format!("bucket_content_with_values failed: {}", e));
                return;
            }
        };
        let mget_calls = self.storage.store().stats().mget_calls - before;
        self.result.mget_calls += mget_calls;
        self.result.drains += 1;

        let expected: BTreeMap<String, Option<String>> = self
            .expected_members
            .get(&bucket)
            .into_iter()
            .flatten()
            .map(|key| (key.clone(), self.expected_values.get(key).cloned()))
            .collect();
        if content != expected {
            self.violation(format!(
                "Drain mismatch for {}: got {} entries, expected {}",
                bucket,
                content.len(),
                expected.len()
            ));
        }

        let batch = self.config.mget_batch_size.max(1);
        let expected_calls = expected.len().div_ceil(batch) as u64;
        if mget_calls != expected_calls {
            self.violation(format!(
                "Drain of {} keys issued {} MGETs, expected {}",
                expected.len(),
                mget_calls,
                expected_calls
            ));
        }
    }

    fn check_invariants(&self) -> Result<(), String> {
        // Invariant 1: Registry lists exactly the open buckets, in order
        let listed = self
            .storage
            .all_buckets()
            .map_err(|e| format!("all_buckets failed: {}", e))?;
        let expected: Vec<BucketId> = self.expected_open.iter().cloned().collect();
        if listed != expected {
            return Err(format!(
                "Registry mismatch: listed={:?}, expected={:?}",
                listed, expected
            ));
        }

        // Invariant 2: Membership matches for every bucket ever written,
        // open or not
        for (bucket, members) in &self.expected_members {
            let actual: HashSet<String> = self
                .storage
                .bucket_content(bucket)
                .map_err(|e| format!("bucket_content failed: {}", e))?
                .into_iter()
                .collect();
            if &actual != members {
                let missing: Vec<_> = members.difference(&actual).collect();
                let extra: Vec<_> = actual.difference(members).collect();
                return Err(format!(
                    "Members mismatch for {}: missing={:?}, extra={:?}",
                    bucket, missing, extra
                ));
            }
        }

        Ok(())
    }

    pub fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.run_single_op();
            if !self.result.invariant_violations.is_empty() {
                break;
            }
        }
    }

    pub fn result(&self) -> &BucketDSTResult {
        &self.result
    }

    pub fn storage(&self) -> &BucketStorage<InMemoryStore> {
        &self.storage
    }
}

/// Run a batch of DST tests
pub fn run_bucket_batch(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> BucketDSTConfig,
) -> Vec<BucketDSTResult> {
    (0..num_seeds)
        .map(|i| {
            let seed = start_seed + i as u64;
            let mut harness = BucketDSTHarness::new(config_fn(seed));
            harness.run(ops_per_seed);
            harness.result().clone()
        })
        .collect()
}

/// Summarize batch results
pub fn summarize_bucket_batch(results: &[BucketDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_success()).count();
    let failed = total - passed;
    let total_ops: u64 = results.iter().map(|r| r.total_operations).sum();

    let mut summary = format!(
        "Bucket DST Summary\n\
         ==================\n\
         Seeds: {} total, {} passed, {} failed\n\
         Total operations: {}\n",
        total, passed, failed, total_ops
    );

    if failed > 0 {
        summary.push_str("\nFailed seeds:\n");
        for result in results.iter().filter(|r| !r.is_success()) {
            summary.push_str(&format!("  Seed {}: {}\n", result.seed, result.summary()));
            for violation in &result.invariant_violations {
                summary.push_str(&format!("    - {}\n", violation));
            }
        }
    }

    summary
}
