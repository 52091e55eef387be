//! CLI for the shardget download engine.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use shardget_core::config::{self, ShardgetConfig};
use shardget_core::{Engine, TransferError};
use std::path::PathBuf;

use commands::{run_checksum, run_completions, run_fetch, run_probe};

/// Top-level CLI for shardget.
#[derive(Debug, Parser)]
#[command(name = "shardget")]
#[command(about = "shardget: parallel sharded HTTP downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL to a local file.
    Fetch(FetchArgs),

    /// Show what the server reports for a URL (HEAD request).
    Probe {
        /// Direct HTTP/HTTPS URL.
        url: String,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Direct HTTP/HTTPS URL to download.
    pub url: String,

    /// Destination path (default: last URL path segment in the current directory).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Content length in bytes, if already known (skips the HEAD probe).
    #[arg(long, value_name = "BYTES")]
    pub length: Option<u64>,

    /// Maximum concurrent shard downloads.
    #[arg(long, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Shard size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub shard_size: Option<u64>,

    /// Receive buffer size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Use a single stream even if the server supports ranges.
    #[arg(long, conflicts_with = "sharded")]
    pub sequential: bool,

    /// Require the sharded engine (fails if the length cannot be probed).
    #[arg(long)]
    pub sharded: bool,

    /// Expected SHA-256 (hex). The file is deleted if it does not match.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Leave an existing destination alone (if it matches --sha256 when given).
    #[arg(long)]
    pub skip_existing: bool,
}

impl FetchArgs {
    pub fn engine(&self) -> Engine {
        if self.sequential {
            Engine::Sequential
        } else if self.sharded {
            Engine::Sharded
        } else {
            Engine::Auto
        }
    }
}

/// Exit status after Ctrl-C (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// Process exit status for a failed command; a cancelled transfer is not an error.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TransferError>() {
        Some(e) if e.is_cancelled() => EXIT_CANCELLED,
        _ => 1,
    }
}

fn load_config() -> Result<ShardgetConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch(args) => run_fetch(&load_config()?, args).await?,
            CliCommand::Probe { url } => run_probe(&load_config()?, &url).await?,
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
