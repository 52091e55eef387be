//! Per-attempt shard error type, used for retry classification.

use std::fmt;

/// Error returned by a single shard (or sequential) transfer attempt.
/// Kept separate from `TransferError` so it can be classified for retry first.
#[derive(Debug)]
pub enum ShardError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Body length differed from the requested range (server closed early,
    /// or ignored `Range` and sent more than asked for).
    PartialTransfer { expected: u64, received: u64 },
    /// Disk write failed (disk full, permission denied). Not retried.
    Storage(std::io::Error),
    /// The shared cancellation token fired while this attempt was in flight.
    Cancelled,
}

impl ShardError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShardError::Cancelled)
    }
}

impl fmt::Display for ShardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardError::Curl(e) => write!(f, "{}", e),
            ShardError::Http(code) => write!(f, "HTTP {}", code),
            ShardError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            ShardError::Storage(e) => write!(f, "storage: {}", e),
            ShardError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for ShardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShardError::Curl(e) => Some(e),
            ShardError::Storage(e) => Some(e),
            ShardError::Http(_) | ShardError::PartialTransfer { .. } | ShardError::Cancelled => None,
        }
    }
}

impl From<std::io::Error> for ShardError {
    fn from(e: std::io::Error) -> Self {
        ShardError::Storage(e)
    }
}
