//! Bucket Inspector
//!
//! Read-only look at the changed-keys buckets of a stats store.
//!
//! ## Usage
//!
//! ```bash
//! # List open buckets, oldest first
//! bucket-inspect list
//!
//! # Dump a bucket's keys and current values as JSON
//! bucket-inspect show 20140729182500
//!
//! # Same, with settings from a TOML file instead of the environment
//! bucket-inspect --config stats-buckets.toml show 20140729182500
//! ```
//!
//! Without `--config`, settings come from `STATS_BUCKETS_*` environment
//! variables. Log verbosity follows `RUST_LOG` (default: info, on stderr).

use stats_buckets::{BucketId, BucketStorage, BucketStorageConfig, RedisStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: bucket-inspect [--config <file>] (list | show <bucket>)";

enum Action {
    List,
    Show(BucketId),
}

struct Args {
    config: Option<PathBuf>,
    action: Action,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut config = None;
    let mut action = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            "list" => action = Some(Action::List),
            "show" => {
                let bucket = args.next().ok_or("show needs a bucket id")?;
                let bucket = bucket.parse::<BucketId>().map_err(|e| e.to_string())?;
                action = Some(Action::Show(bucket));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => return Err(format!("unexpected argument {:?}\n{}", other, USAGE)),
        }
    }

    let action = action.ok_or_else(|| USAGE.to_string())?;
    Ok(Args { config, action })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => BucketStorageConfig::from_file(path)?,
        None => BucketStorageConfig::from_env()?,
    };

    let store = RedisStore::connect(&config.redis_url)?;
    info!(url = %config.redis_url, "connected");
    let storage = BucketStorage::from_config(store, &config)?;

    match args.action {
        Action::List => {
            for bucket in storage.all_buckets()? {
                println!("{}", bucket);
            }
        }
        Action::Show(bucket) => {
            let content = storage.bucket_content_with_values(&bucket)?;
            info!(bucket = %bucket, keys = content.len(), "bucket read");
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
    }

    Ok(())
}
