//! HTTP HEAD / metadata probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers and resolve the
//! total `Content-Length` needed for shard planning, plus `Accept-Ranges` to
//! decide whether the origin can be sharded at all.

mod parse;

use std::collections::HashMap;
use std::str;
use std::time::Duration;

use crate::control::CancelToken;
use crate::error::TransferError;

/// Headers of a HEAD response that matter to the download engines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Declared `Content-Length`, kept signed so bogus negative values can be
    /// reported as `InvalidLength` rather than silently dropped.
    pub content_length: Option<i64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// `Content-Disposition` value if present (filename hint).
    pub content_disposition: Option<String>,
}

impl HeadResult {
    /// Validated total length: `LengthUnavailable` if absent, `InvalidLength`
    /// if zero or negative.
    pub fn require_length(&self, url: &str) -> Result<u64, TransferError> {
        match self.content_length {
            None => Err(TransferError::LengthUnavailable { url: url.to_string() }),
            Some(n) if n <= 0 => Err(TransferError::InvalidLength(n)),
            Some(n) => Ok(n as u64),
        }
    }
}

/// Performs a HEAD request and returns the parsed metadata of the final
/// response (redirects are followed). Blocks the calling thread; `cancel`
/// aborts the request in flight and yields `TransferError::Cancelled`.
pub fn probe(
    url: &str,
    custom_headers: &HashMap<String, String>,
    connect_timeout: Duration,
    cancel: &CancelToken,
) -> Result<HeadResult, TransferError> {
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let failed = |reason: String| TransferError::ProbeFailed {
        url: url.to_string(),
        status: None,
        reason,
    };
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    let setup = (|| -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.nobody(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(connect_timeout)?;
        easy.timeout(Duration::from_secs(60))?;
        easy.progress(true)?;
        let mut list = curl::easy::List::new();
        for (k, v) in custom_headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !custom_headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(())
    })();
    setup.map_err(|e| failed(e.to_string()))?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(|e| failed(e.to_string()))?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(|e| failed(e.to_string()))?;
        if let Err(e) = transfer.perform() {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            return Err(failed(e.to_string()));
        }
    }

    let code = easy.response_code().map_err(|e| failed(e.to_string()))?;
    if !(200..300).contains(&code) {
        return Err(TransferError::ProbeFailed {
            url: url.to_string(),
            status: Some(code),
            reason: format!("HTTP {}", code),
        });
    }

    let head = parse::parse_headers(&headers);
    tracing::debug!(
        url,
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        "probe complete"
    );
    Ok(head)
}
