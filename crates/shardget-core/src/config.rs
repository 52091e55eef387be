use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::downloader::{TransferOptions, DEFAULT_BUFFER_SIZE};
use crate::retry::RetryPolicy;
use crate::segmenter::DEFAULT_SHARD_SIZE;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per shard (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_secs: 0.25,
            max_delay_secs: 10,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::try_from_secs_f64(cfg.base_delay_secs).unwrap_or_default(),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/shardget/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardgetConfig {
    /// Receive/copy buffer size in bytes.
    pub buffer_size: usize,
    /// Target shard size in bytes.
    pub shard_size: u64,
    /// Maximum concurrent shard downloads (None = cores clamped to 2..=6).
    pub max_parallelism: Option<usize>,
    /// Minimum spacing between progress snapshots.
    pub report_interval_ms: u64,
    pub connect_timeout_secs: u64,
    /// Optional retry policy; if missing, shards fail on the first error.
    pub retry: Option<RetryConfig>,
}

impl Default for ShardgetConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            shard_size: DEFAULT_SHARD_SIZE,
            max_parallelism: None,
            report_interval_ms: 500,
            connect_timeout_secs: 30,
            retry: None,
        }
    }
}

impl ShardgetConfig {
    /// Options for one transfer, seeded from this config.
    pub fn transfer_options(&self, url: impl Into<String>, destination: impl Into<PathBuf>) -> TransferOptions {
        let mut opts = TransferOptions::new(url, destination);
        opts.buffer_size = self.buffer_size;
        opts.shard_size = self.shard_size;
        opts.max_parallelism = self.max_parallelism;
        opts.report_interval = Duration::from_millis(self.report_interval_ms);
        opts.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        opts.retry = self.retry.as_ref().map(RetryPolicy::from);
        opts
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shardget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ShardgetConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<ShardgetConfig> {
    if !path.exists() {
        let default_cfg = ShardgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: ShardgetConfig = toml::from_str(&data)?;
    Ok(cfg)
}
