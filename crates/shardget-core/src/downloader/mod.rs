//! Core sharded downloader engine.
//!
//! Consumes a URL + options, splits the resource into fixed-size shards, runs
//! concurrent HTTP Range GETs (bounded by the parallelism cap) that write each
//! shard at its offset in a pre-sized destination, and folds their progress
//! into one throttled stream. `fetch` picks between this engine and the
//! sequential fallback.

mod copy;
mod options;
mod request;
mod run;
mod segment;
mod single;

pub use copy::{copy_stream, StreamCopier};
pub use options::{default_parallelism, TransferOptions, DEFAULT_BUFFER_SIZE};
pub use single::download_single;

use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::error::TransferError;
use crate::fetch_head::{self, HeadResult};
use crate::progress::ProgressAggregator;
use crate::segmenter::{plan_shards, Shard};
use crate::storage;
use request::RequestSettings;
use segment::ShardContext;

/// A transfer whose length is known and whose shards are planned.
#[derive(Debug)]
pub struct ShardedDownloader {
    options: TransferOptions,
    shards: Vec<Shard>,
}

impl ShardedDownloader {
    /// Validate `options`, probe the source if no length was supplied, and
    /// plan the shards. Fails before any destination I/O; `cancel` aborts the
    /// probe.
    pub fn create(mut options: TransferOptions, cancel: &CancelToken) -> Result<Self, TransferError> {
        options.validate()?;
        let length = options.resolve_content_length(cancel)?;
        let shards = plan_shards(length, options.shard_size);
        tracing::debug!(
            url = %options.source_url,
            content_length = length,
            shard_size = options.shard_size,
            shards = shards.len(),
            "shard plan ready"
        );
        Ok(Self { options, shards })
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn content_length(&self) -> u64 {
        self.options.content_length()
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Runs every shard and returns once the file is complete and closed.
    ///
    /// `status` builds a snapshot from `(bytes_done, content_length)`; `sink`
    /// receives at most one per report interval, plus exactly one final
    /// snapshot with `bytes_done == content_length` on success. Sink calls
    /// come from worker threads but never overlap.
    pub fn download<S, F, P>(&self, status: F, sink: P, cancel: &CancelToken) -> Result<(), TransferError>
    where
        F: Fn(u64, u64) -> S + Sync,
        P: Fn(S) + Sync,
    {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let length = self.content_length();
        let writer = storage::open_presized(&self.options.destination, length).map_err(TransferError::storage)?;
        let progress = ProgressAggregator::new(length, self.options.report_interval, status, sink);

        let ctx = ShardContext {
            url: &self.options.source_url,
            headers: &self.options.headers,
            writer: &writer,
            settings: RequestSettings {
                connect_timeout: self.options.connect_timeout,
                buffer_size: self.options.buffer_size,
            },
            report_interval: self.options.report_interval,
        };
        let parallelism = self.options.parallelism();
        tracing::info!(
            url = %self.options.source_url,
            destination = %self.options.destination.display(),
            content_length = length,
            shards = self.shards.len(),
            parallelism,
            "starting sharded download"
        );

        let report = |delta: u64| progress.report(delta);
        run::run_shards(
            &ctx,
            &self.shards,
            parallelism,
            self.options.retry.as_ref(),
            cancel,
            &report,
        )?;
        writer.close().map_err(TransferError::storage)?;
        Ok(())
    }
}

/// Which engine `fetch` runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Engine {
    /// Sharded when the length is known and the origin serves ranges,
    /// sequential otherwise.
    #[default]
    Auto,
    Sharded,
    Sequential,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Auto => "auto",
            Engine::Sharded => "sharded",
            Engine::Sequential => "sequential",
        }
    }
}

/// Outcome of a successful `fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Engine that actually ran (never `Auto`).
    pub engine: Engine,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Resolved choice of engine and, for the sequential one, the expected length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Sharded,
    Sequential(Option<u64>),
}

/// Engine choice for a probed origin without a caller-supplied length.
fn plan_from_head(head: &HeadResult) -> Result<Plan, TransferError> {
    match head.content_length {
        Some(n) if n <= 0 => Err(TransferError::InvalidLength(n)),
        Some(_) if head.accept_ranges => Ok(Plan::Sharded),
        Some(n) => Ok(Plan::Sequential(Some(n as u64))),
        None => Ok(Plan::Sequential(None)),
    }
}

fn known_length(options: &TransferOptions) -> Option<u64> {
    Some(options.content_length()).filter(|&n| n > 0)
}

/// Downloads `options.source_url` to `options.destination` with the chosen
/// engine. Blocks the calling thread.
///
/// Whichever engine runs, `status` receives `(bytes_done, total)`; `total` is 0
/// while the sequential engine does not know the length, and the last snapshot
/// of a successful transfer always has `bytes_done == total`.
pub fn fetch<S, F, P>(
    mut options: TransferOptions,
    engine: Engine,
    status: F,
    sink: P,
    cancel: &CancelToken,
) -> Result<TransferReport, TransferError>
where
    F: Fn(u64, u64) -> S + Sync,
    P: Fn(S) + Sync,
{
    options.validate()?;
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let started = Instant::now();

    let plan = match engine {
        Engine::Sharded => Plan::Sharded,
        Engine::Sequential => Plan::Sequential(known_length(&options)),
        Engine::Auto if known_length(&options).is_some() => Plan::Sharded,
        Engine::Auto => match fetch_head::probe(&options.source_url, &options.headers, options.connect_timeout, cancel) {
            Ok(head) => {
                let plan = plan_from_head(&head)?;
                if plan == Plan::Sharded {
                    options.apply_probe(&head)?;
                }
                plan
            }
            Err(e) if e.is_head_rejected() => {
                tracing::warn!(error = %e, "HEAD refused, falling back to sequential download");
                Plan::Sequential(None)
            }
            Err(e) => return Err(e),
        },
    };

    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let (engine, bytes) = match plan {
        Plan::Sharded => {
            let downloader = ShardedDownloader::create(options, cancel)?;
            downloader.download(&status, &sink, cancel)?;
            (Engine::Sharded, downloader.content_length())
        }
        Plan::Sequential(expected) => {
            tracing::info!(
                url = %options.source_url,
                destination = %options.destination.display(),
                expected = ?expected,
                "starting sequential download"
            );
            let total = expected.unwrap_or(0);
            let copied = download_single(&options, expected, |_, copied| status(copied, total), &sink, cancel)?;
            if expected.is_none() {
                sink(status(copied, copied));
            }
            (Engine::Sequential, copied)
        }
    };

    let report = TransferReport {
        engine,
        bytes,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        engine = engine.as_str(),
        bytes,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "download complete"
    );
    Ok(report)
}

/// `fetch` on the tokio blocking pool. Cancel through a clone of `cancel`.
pub async fn fetch_async<S, F, P>(
    options: TransferOptions,
    engine: Engine,
    status: F,
    sink: P,
    cancel: CancelToken,
) -> Result<TransferReport, TransferError>
where
    S: 'static,
    F: Fn(u64, u64) -> S + Send + Sync + 'static,
    P: Fn(S) + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || fetch(options, engine, status, sink, &cancel))
        .await
        .map_err(|e| TransferError::Worker(e.to_string()))?
}
