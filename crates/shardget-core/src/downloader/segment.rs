//! Single-shard ranged GET, written to the destination at the shard's offset.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use super::request::{self, RequestSettings};
use crate::control::CancelToken;
use crate::retry::ShardError;
use crate::segmenter::Shard;
use crate::storage::DestinationWriter;

/// What every shard task of one transfer shares.
pub(super) struct ShardContext<'a> {
    pub url: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub writer: &'a DestinationWriter,
    pub settings: RequestSettings,
    pub report_interval: Duration,
}

/// Bytes of one shard already forwarded to the aggregator. Survives retries so
/// a re-fetched prefix is not counted twice.
#[derive(Debug, Default)]
pub(super) struct ShardTally {
    reported: u64,
}

impl ShardTally {
    /// Forward whatever `written` adds beyond what was already reported.
    fn forward<R: Fn(u64)>(&mut self, written: u64, report: &R) {
        let pending = written.saturating_sub(self.reported);
        self.reported += pending;
        report(pending);
    }
}

/// Downloads one shard: GET with `Range: bytes=start-end`, each received chunk
/// written at `start + bytes_written_so_far`. Raw deltas go to `report` at most
/// once per `report_interval`, plus once at the end of the shard.
pub(super) fn download_one_shard<R: Fn(u64)>(
    ctx: &ShardContext<'_>,
    shard: &Shard,
    tally: &mut ShardTally,
    cancel: &CancelToken,
    report: &R,
) -> Result<(), ShardError> {
    if cancel.is_cancelled() {
        return Err(ShardError::Cancelled);
    }

    let expected = shard.len();
    let mut written = 0u64;
    let mut received = 0u64;
    let mut storage_error: Option<io::Error> = None;
    let mut last_report = Instant::now();

    let mut easy = curl::easy::Easy::new();
    request::configure(&mut easy, ctx.url, ctx.headers, ctx.settings).map_err(ShardError::Curl)?;
    easy.range(&shard.curl_range()).map_err(ShardError::Curl)?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if cancel.is_cancelled() {
                    return Ok(0);
                }
                let len = data.len() as u64;
                received += len;
                if written + len > expected {
                    // Server ignored Range; writing on would clobber the next shard.
                    return Ok(0);
                }
                if let Err(e) = ctx.writer.write_at(shard.start + written, data) {
                    storage_error = Some(e);
                    return Ok(0);
                }
                written += len;
                if last_report.elapsed() > ctx.report_interval {
                    tally.forward(written, report);
                    last_report = Instant::now();
                }
                Ok(data.len())
            })
            .map_err(ShardError::Curl)?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(ShardError::Curl)?;
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if let Some(io_err) = storage_error {
            return Err(ShardError::Storage(io_err));
        }
        if cancel.is_cancelled() {
            return Err(ShardError::Cancelled);
        }
        if received > expected {
            return Err(ShardError::PartialTransfer { expected, received });
        }
        if e.is_http_returned_error() {
            let code = easy.response_code().map_err(ShardError::Curl)?;
            return Err(ShardError::Http(code));
        }
        return Err(ShardError::Curl(e));
    }

    let code = easy.response_code().map_err(ShardError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(ShardError::Http(code));
    }
    if written != expected {
        return Err(ShardError::PartialTransfer {
            expected,
            received: written,
        });
    }

    tally.forward(written, report);
    Ok(())
}
