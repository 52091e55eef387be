//! `shardget fetch` – download one URL with a console progress line.

use anyhow::{bail, Result};
use shardget_core::checksum;
use shardget_core::config::ShardgetConfig;
use shardget_core::progress::{format_size, DownloadStatus};
use shardget_core::{fetch_async, CancelToken, TransferOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::FetchArgs;

/// Last URL path segment, if it is usable as a file name.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root;
/// `.` and `..` never name a file.
pub(crate) fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Destination file name for `url`, `"download"` when the path names none.
pub(crate) fn default_file_name(url: &str) -> String {
    filename_from_url_path(url).unwrap_or_else(|| "download".to_string())
}

/// Config values overridden by whatever was given on the command line.
pub(crate) fn build_options(cfg: &ShardgetConfig, args: &FetchArgs) -> TransferOptions {
    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_file_name(&args.url)));
    let mut opts = cfg.transfer_options(args.url.clone(), destination);
    if let Some(n) = args.length {
        opts = opts.with_content_length(n);
    }
    if let Some(n) = args.parallelism {
        opts.max_parallelism = Some(n);
    }
    if let Some(n) = args.shard_size {
        opts.shard_size = n;
    }
    if let Some(n) = args.buffer_size {
        opts.buffer_size = n;
    }
    opts
}

fn print_status(status: DownloadStatus) {
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "\r{:<60}", status.description);
    let _ = err.flush();
}

async fn matches_sha256(path: &Path, expected: &str) -> Result<bool> {
    let owned = path.to_path_buf();
    let expected = expected.to_string();
    tokio::task::spawn_blocking(move || checksum::verify_sha256(&owned, &expected)).await?
}

pub async fn run_fetch(cfg: &ShardgetConfig, args: FetchArgs) -> Result<()> {
    let opts = build_options(cfg, &args);
    let destination = opts.destination.clone();

    if args.skip_existing && destination.exists() {
        match args.sha256.as_deref() {
            None => {
                println!("{} exists, skipping", destination.display());
                return Ok(());
            }
            Some(expected) if matches_sha256(&destination, expected).await? => {
                println!("{} exists and matches SHA-256, skipping", destination.display());
                return Ok(());
            }
            Some(_) => {
                tracing::info!(path = %destination.display(), "existing file does not match SHA-256, downloading again");
            }
        }
    }

    let cancel = CancelToken::new();
    let on_ctrl_c = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling download");
            on_ctrl_c.cancel();
        }
    });

    let result = fetch_async(opts, args.engine(), DownloadStatus::new, print_status, cancel).await;
    signal_task.abort();
    eprintln!();
    let report = result?;

    if let Some(expected) = args.sha256.as_deref() {
        if !matches_sha256(&destination, expected).await? {
            std::fs::remove_file(&destination)?;
            bail!(
                "SHA-256 mismatch for {} (expected {}); file deleted",
                destination.display(),
                expected
            );
        }
    }

    println!(
        "{} ({}) saved to {} in {:.1}s [{}]",
        format_size(report.bytes),
        report.bytes,
        destination.display(),
        report.elapsed.as_secs_f64(),
        report.engine.as_str()
    );
    Ok(())
}
