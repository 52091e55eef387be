//! Single-stream HTTP GET (no Range) feeding the sequential copy engine.

use std::io;

use super::copy::StreamCopier;
use super::options::TransferOptions;
use super::request::{self, RequestSettings};
use crate::control::CancelToken;
use crate::error::TransferError;
use crate::retry::ShardError;
use crate::storage::DestinationBuilder;

/// Downloads `options.source_url` with one GET, writing the body sequentially
/// to `options.destination`. When `expected_len` is known the file is
/// pre-sized and a body of any other length is an error. Status factory
/// contract is the sequential one: `(bytes_since_last_report, bytes_copied)`.
pub fn download_single<S, F, P>(
    options: &TransferOptions,
    expected_len: Option<u64>,
    status: F,
    sink: P,
    cancel: &CancelToken,
) -> Result<u64, TransferError>
where
    F: Fn(u64, u64) -> S,
    P: Fn(S),
{
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let failed = |e: ShardError| TransferError::from_shard(None, e);

    let mut builder = DestinationBuilder::create(&options.destination).map_err(TransferError::storage)?;
    if let Some(len) = expected_len {
        builder.preallocate(len).map_err(TransferError::storage)?;
    }
    let mut copier = StreamCopier::new(builder.into_file(), status, sink);
    let mut storage_error: Option<io::Error> = None;

    let settings = RequestSettings {
        connect_timeout: options.connect_timeout,
        buffer_size: options.buffer_size,
    };
    let mut easy = curl::easy::Easy::new();
    request::configure(&mut easy, &options.source_url, &options.headers, settings)
        .map_err(|e| failed(ShardError::Curl(e)))?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if cancel.is_cancelled() {
                    return Ok(0);
                }
                match copier.feed(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        storage_error = Some(e);
                        Ok(0)
                    }
                }
            })
            .map_err(|e| failed(ShardError::Curl(e)))?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(|e| failed(ShardError::Curl(e)))?;
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if let Some(io_err) = storage_error {
            return Err(failed(ShardError::Storage(io_err)));
        }
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        if e.is_http_returned_error() {
            let code = easy.response_code().map_err(|e| failed(ShardError::Curl(e)))?;
            return Err(failed(ShardError::Http(code)));
        }
        return Err(failed(ShardError::Curl(e)));
    }

    let code = easy.response_code().map_err(|e| failed(ShardError::Curl(e)))?;
    if !(200..300).contains(&code) {
        return Err(failed(ShardError::Http(code)));
    }
    if let Some(expected) = expected_len {
        if copier.copied() != expected {
            return Err(failed(ShardError::PartialTransfer {
                expected,
                received: copier.copied(),
            }));
        }
    }

    let (copied, file) = copier.finish().map_err(TransferError::storage)?;
    file.sync_all().map_err(TransferError::storage)?;
    Ok(copied)
}
