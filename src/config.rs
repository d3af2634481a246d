//! Bucket storage configuration
//!
//! Loaded from a TOML file or from environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | STATS_BUCKETS_REDIS_URL | redis://127.0.0.1:6379 | Store holding buckets and stats values |
//! | STATS_BUCKETS_MGET_BATCH_SIZE | 200 | Keys per MGET when reading bucket values |
//! | STATS_BUCKETS_INTERVAL_SECS | 10 | Seconds covered by one bucket |

use crate::bucket::{DEFAULT_BUCKET_INTERVAL, DEFAULT_MGET_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error reading config: {}", e),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketStorageConfig {
    /// Store URL
    pub redis_url: String,
    /// Keys per MGET when reading bucket values (default: 200)
    pub mget_batch_size: usize,
    /// Seconds covered by one bucket (default: 10)
    #[serde(with = "duration_secs")]
    pub bucket_interval: Duration,
}

impl Default for BucketStorageConfig {
    fn default() -> Self {
        BucketStorageConfig {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            mget_batch_size: DEFAULT_MGET_BATCH_SIZE,
            bucket_interval: DEFAULT_BUCKET_INTERVAL,
        }
    }
}

impl BucketStorageConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BucketStorageConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = BucketStorageConfig::default();
        if let Some(url) = lookup("STATS_BUCKETS_REDIS_URL") {
            config.redis_url = url;
        }
        if let Some(size) = lookup("STATS_BUCKETS_MGET_BATCH_SIZE") {
            config.mget_batch_size = size.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("STATS_BUCKETS_MGET_BATCH_SIZE={:?}", size))
            })?;
        }
        if let Some(secs) = lookup("STATS_BUCKETS_INTERVAL_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("STATS_BUCKETS_INTERVAL_SECS={:?}", secs))
            })?;
            config.bucket_interval = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis_url.is_empty() {
            return Err(ConfigError::Invalid("redis_url is empty".to_string()));
        }
        if self.mget_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "mget_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.bucket_interval.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "bucket_interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
