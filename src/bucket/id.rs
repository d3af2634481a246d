//! Bucket identifiers
//!
//! A bucket is named after the UTC start of its interval, rendered as
//! `YYYYMMDDHHMMSS`. The registry scores every bucket by its own numeric
//! value, so an id is restricted to ASCII digits short enough to survive
//! the round trip through an `f64` score unchanged.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Longest id whose numeric value is still exact as an `f64` score.
pub const MAX_BUCKET_ID_LEN: usize = 15;

/// Bucket creation interval used when none is configured.
pub const DEFAULT_BUCKET_INTERVAL: Duration = Duration::from_secs(10);

const BUCKET_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketIdError {
    Empty,
    NonDigit(char),
    TooLong(usize),
    ZeroInterval,
    OutOfRange(i64),
}

impl fmt::Display for BucketIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketIdError::Empty => write!(f, "bucket id is empty"),
            BucketIdError::NonDigit(c) => write!(f, "bucket id contains non-digit {:?}", c),
            BucketIdError::TooLong(len) => write!(
                f,
                "bucket id has {} digits, at most {} allowed",
                len, MAX_BUCKET_ID_LEN
            ),
            BucketIdError::ZeroInterval => write!(f, "bucket interval must be at least one second"),
            BucketIdError::OutOfRange(ts) => write!(f, "timestamp {} out of range", ts),
        }
    }
}

impl std::error::Error for BucketIdError {}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(String);

impl BucketId {
    pub fn new(id: impl Into<String>) -> Result<Self, BucketIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(BucketIdError::Empty);
        }
        if let Some(c) = id.chars().find(|c| !c.is_ascii_digit()) {
            return Err(BucketIdError::NonDigit(c));
        }
        if id.len() > MAX_BUCKET_ID_LEN {
            return Err(BucketIdError::TooLong(id.len()));
        }
        Ok(BucketId(id))
    }

    /// Bucket that `time` falls into when buckets are opened every
    /// `interval` (whole seconds, aligned to the Unix epoch).
    pub fn for_time(time: DateTime<Utc>, interval: Duration) -> Result<Self, BucketIdError> {
        let interval_secs = i64::try_from(interval.as_secs()).unwrap_or(i64::MAX);
        if interval_secs == 0 {
            return Err(BucketIdError::ZeroInterval);
        }

        let ts = time.timestamp();
        let start = ts - ts.rem_euclid(interval_secs);
        let start_time =
            DateTime::<Utc>::from_timestamp(start, 0).ok_or(BucketIdError::OutOfRange(start))?;
        Self::new(start_time.format(BUCKET_TIME_FORMAT).to_string())
    }

    pub fn current(interval: Duration) -> Result<Self, BucketIdError> {
        Self::for_time(Utc::now(), interval)
    }

    /// Registry score: the id read as a number.
    pub fn score(&self) -> f64 {
        // Digits-only and at most 15 of them, so this is exact
        self.0.bytes().fold(0.0, |acc, b| acc * 10.0 + f64::from(b - b'0'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BucketId {
    type Err = BucketIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BucketId::new(s)
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
