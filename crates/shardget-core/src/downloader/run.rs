//! Bounded worker pool driving shard downloads.

use std::collections::VecDeque;
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread;

use super::segment::{self, ShardContext, ShardTally};
use crate::control::CancelToken;
use crate::error::TransferError;
use crate::retry::{run_with_retry, RetryPolicy, ShardError};
use crate::segmenter::Shard;

/// Runs every shard on at most `parallelism` worker threads.
///
/// The first real failure cancels all siblings (through a child of `cancel`,
/// leaving the caller's token untouched) and is what gets returned, even if
/// the siblings then report cancellation. `Cancelled` is returned only when
/// no shard failed on its own.
pub(super) fn run_shards<R>(
    ctx: &ShardContext<'_>,
    shards: &[Shard],
    parallelism: usize,
    retry: Option<&RetryPolicy>,
    cancel: &CancelToken,
    report: &R,
) -> Result<(), TransferError>
where
    R: Fn(u64) + Sync,
{
    let abort = cancel.child_token();
    let work: Mutex<VecDeque<(usize, Shard)>> = Mutex::new(shards.iter().copied().enumerate().collect());
    let num_workers = parallelism.max(1).min(shards.len());
    let (tx, rx) = mpsc::channel::<(usize, Result<(), ShardError>)>();

    let results: Vec<(usize, Result<(), ShardError>)> = thread::scope(|s| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            let abort = &abort;
            s.spawn(move || loop {
                if abort.is_cancelled() {
                    break;
                }
                let next = work.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
                let Some((index, shard)) = next else {
                    break;
                };
                let mut tally = ShardTally::default();
                let res = match retry {
                    Some(policy) => run_with_retry(policy, abort, |attempt| {
                        if attempt > 1 {
                            tracing::debug!(shard = index, attempt, "retrying shard");
                        }
                        segment::download_one_shard(ctx, &shard, &mut tally, abort, report)
                    }),
                    None => segment::download_one_shard(ctx, &shard, &mut tally, abort, report),
                };
                if let Err(e) = &res {
                    if !e.is_cancelled() {
                        tracing::warn!(shard = index, start = shard.start, end = shard.end, error = %e, "shard failed, cancelling siblings");
                        abort.cancel();
                    }
                }
                if tx.send((index, res)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        rx.iter().collect()
    });

    let mut first_error: Option<(usize, ShardError)> = None;
    let mut completed = 0usize;
    for (index, res) in results {
        match res {
            Ok(()) => completed += 1,
            Err(ShardError::Cancelled) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some((index, e));
                }
            }
        }
    }

    if let Some((index, source)) = first_error {
        return Err(TransferError::TransferFailed {
            shard: Some(index),
            source,
        });
    }
    if completed != shards.len() {
        tracing::info!(completed, total = shards.len(), "transfer cancelled");
        return Err(TransferError::Cancelled);
    }
    Ok(())
}
