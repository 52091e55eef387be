//! Per-transfer options and their validation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::control::CancelToken;
use crate::error::TransferError;
use crate::fetch_head::{self, HeadResult};
use crate::progress::DEFAULT_REPORT_INTERVAL;
use crate::retry::RetryPolicy;
use crate::segmenter::DEFAULT_SHARD_SIZE;

/// Read/receive buffer size: 80 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 80 * 1024;

/// Parallelism used when none is configured: available cores clamped to 2..=6.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .clamp(2, 6)
}

/// Everything one transfer needs. Construct once per transfer.
///
/// `content_length` is 0 while unknown; it is set at most once, either by
/// `with_content_length` before the transfer or by `resolve_content_length`,
/// and is strictly positive before any shard work begins.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub source_url: String,
    pub destination: PathBuf,
    content_length: u64,
    pub buffer_size: usize,
    pub shard_size: u64,
    /// `None` = `default_parallelism()`.
    pub max_parallelism: Option<usize>,
    pub report_interval: Duration,
    /// Extra request headers sent with the probe and every GET.
    pub headers: HashMap<String, String>,
    pub connect_timeout: Duration,
    /// `None` = fail on the first error, as the engine always has.
    pub retry: Option<RetryPolicy>,
}

impl TransferOptions {
    pub fn new(source_url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
            content_length: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shard_size: DEFAULT_SHARD_SIZE,
            max_parallelism: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
            headers: HashMap::new(),
            connect_timeout: Duration::from_secs(30),
            retry: None,
        }
    }

    /// Supply the length out of band so the probe is skipped. 0 keeps it unknown.
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = content_length;
        self
    }

    /// 0 while unknown.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn parallelism(&self) -> usize {
        match self.max_parallelism {
            Some(n) => n.max(1),
            None => default_parallelism(),
        }
    }

    /// Reject options no transfer could run with, before any I/O.
    pub fn validate(&self) -> Result<(), TransferError> {
        url::Url::parse(&self.source_url).map_err(|source| TransferError::InvalidUrl {
            url: self.source_url.clone(),
            source,
        })?;
        if self.buffer_size == 0 {
            return Err(TransferError::InvalidOptions("buffer size must be positive"));
        }
        if self.shard_size == 0 {
            return Err(TransferError::InvalidOptions("shard size must be positive"));
        }
        if self.max_parallelism == Some(0) {
            return Err(TransferError::InvalidOptions("parallelism must be positive"));
        }
        Ok(())
    }

    /// Probe the source for its length unless it is already known.
    pub fn resolve_content_length(&mut self, cancel: &CancelToken) -> Result<u64, TransferError> {
        if self.content_length > 0 {
            return Ok(self.content_length);
        }
        let head = fetch_head::probe(&self.source_url, &self.headers, self.connect_timeout, cancel)?;
        self.apply_probe(&head)
    }

    /// Take the length from an already performed probe.
    pub(crate) fn apply_probe(&mut self, head: &HeadResult) -> Result<u64, TransferError> {
        if self.content_length > 0 {
            return Ok(self.content_length);
        }
        let length = head.require_length(&self.source_url)?;
        self.content_length = length;
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = TransferOptions::new("https://example.com/pkg.msix", "pkg.msix");
        assert_eq!(opts.content_length(), 0);
        assert_eq!(opts.buffer_size, 80 * 1024);
        assert_eq!(opts.shard_size, 4 * 1024 * 1024);
        assert_eq!(opts.report_interval, Duration::from_millis(500));
        assert!(opts.retry.is_none());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn default_parallelism_is_clamped() {
        let n = default_parallelism();
        assert!((2..=6).contains(&n));
        let opts = TransferOptions::new("http://h/", "f");
        assert_eq!(opts.parallelism(), n);
    }

    #[test]
    fn parallelism_override_is_respected() {
        let mut opts = TransferOptions::new("http://h/", "f");
        opts.max_parallelism = Some(12);
        assert_eq!(opts.parallelism(), 12);
    }

    #[test]
    fn validate_rejects_bad_options() {
        let bad_url = TransferOptions::new("not a url", "f");
        assert!(matches!(bad_url.validate(), Err(TransferError::InvalidUrl { .. })));

        let mut zero_shard = TransferOptions::new("http://h/", "f");
        zero_shard.shard_size = 0;
        assert!(matches!(zero_shard.validate(), Err(TransferError::InvalidOptions(_))));

        let mut zero_buf = TransferOptions::new("http://h/", "f");
        zero_buf.buffer_size = 0;
        assert!(matches!(zero_buf.validate(), Err(TransferError::InvalidOptions(_))));

        let mut zero_par = TransferOptions::new("http://h/", "f");
        zero_par.max_parallelism = Some(0);
        assert!(matches!(zero_par.validate(), Err(TransferError::InvalidOptions(_))));
    }

    #[test]
    fn known_length_skips_probe() {
        // Unroutable URL: any probe attempt would fail.
        let mut opts = TransferOptions::new("http://127.0.0.1:9/", "f").with_content_length(42);
        assert_eq!(opts.resolve_content_length(&CancelToken::new()).unwrap(), 42);
    }

    #[test]
    fn probe_result_is_applied_once() {
        let mut opts = TransferOptions::new("http://h/", "f");
        let head = HeadResult {
            content_length: Some(100),
            ..HeadResult::default()
        };
        assert_eq!(opts.apply_probe(&head).unwrap(), 100);
        let other = HeadResult {
            content_length: Some(5),
            ..HeadResult::default()
        };
        assert_eq!(opts.apply_probe(&other).unwrap(), 100);
        assert_eq!(opts.content_length(), 100);
    }

    #[test]
    fn probe_without_length_is_rejected() {
        let mut opts = TransferOptions::new("http://h/", "f");
        assert!(matches!(
            opts.apply_probe(&HeadResult::default()),
            Err(TransferError::LengthUnavailable { .. })
        ));
        let zero = HeadResult {
            content_length: Some(0),
            ..HeadResult::default()
        };
        assert!(matches!(opts.apply_probe(&zero), Err(TransferError::InvalidLength(0))));
        assert_eq!(opts.content_length(), 0);
    }
}
