// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limiter::RateLimitConfig;
use crate::retention::RetentionTarget;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Address the HTTP server listens on
    #[arg(long, env = "KONVERTD_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Directory with the static web frontend
    #[arg(long, env = "KONVERTD_WWW_ROOT", default_value = "./www")]
    pub www_root: PathBuf,

    /// Where uploads and intermediate outputs are written
    #[arg(long, env = "KONVERTD_UPLOADS_DIR", default_value = "./uploads")]
    pub uploads_dir: PathBuf,

    /// Where finished files are published under /downloads
    #[arg(long, env = "KONVERTD_DOWNLOADS_DIR", default_value = "./www/downloads")]
    pub downloads_dir: PathBuf,

    /// Largest accepted upload in bytes
    #[arg(long, env = "KONVERTD_MAX_UPLOAD_BYTES", default_value_t = 500 * MIB)]
    pub max_upload_bytes: u64,

    /// Conversions a single client may start per window
    #[arg(long, env = "KONVERTD_RATE_LIMIT_CAPACITY", default_value_t = 10)]
    pub rate_limit_capacity: usize,

    /// Length of the rate limit window in seconds
    #[arg(long, env = "KONVERTD_RATE_LIMIT_WINDOW_SECS", default_value_t = 3600)]
    pub rate_limit_window_secs: u64,

    /// Number of tracked clients above which expired ones are dropped
    #[arg(
        long,
        env = "KONVERTD_RATE_LIMIT_COMPACTION_THRESHOLD",
        default_value_t = 1000
    )]
    pub rate_limit_compaction_threshold: usize,

    /// Seconds between two cleanup passes
    #[arg(long, env = "KONVERTD_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// Uploads and downloads older than this many seconds are deleted
    #[arg(long, env = "KONVERTD_MAX_ARTIFACT_AGE_SECS", default_value_t = 3600)]
    pub max_artifact_age_secs: u64,

    /// Maximum number of waiting jobs. Unbounded if not given.
    #[arg(long, env = "KONVERTD_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Kill converters that run longer than this many seconds. No limit if not given.
    #[arg(long, env = "KONVERTD_JOB_TIMEOUT_SECS")]
    pub job_timeout_secs: Option<u64>,
}

/// Everything the services need, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub www_root: PathBuf,
    pub uploads_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub rate_limit: RateLimitConfig,
    pub sweep_interval: Duration,
    pub max_artifact_age: Duration,
    pub queue_capacity: Option<usize>,
    pub job_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// The directories the sweeper is allowed to prune.
    pub fn retention_targets(&self) -> Vec<RetentionTarget> {
        vec![
            RetentionTarget::new(&self.uploads_dir, self.max_artifact_age),
            RetentionTarget::new(&self.downloads_dir, self.max_artifact_age),
        ]
    }
}

impl From<Args> for ServiceConfig {
    fn from(args: Args) -> Self {
        Self {
            listen: args.listen,
            www_root: args.www_root,
            uploads_dir: args.uploads_dir,
            downloads_dir: args.downloads_dir,
            max_upload_bytes: args.max_upload_bytes,
            rate_limit: RateLimitConfig {
                capacity: args.rate_limit_capacity,
                window: Duration::from_secs(args.rate_limit_window_secs),
                compaction_threshold: args.rate_limit_compaction_threshold,
            },
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            max_artifact_age: Duration::from_secs(args.max_artifact_age_secs),
            queue_capacity: args.queue_capacity,
            job_timeout: args.job_timeout_secs.map(Duration::from_secs),
        }
    }
}
