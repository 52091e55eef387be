//! Typed failure taxonomy of a transfer.

use crate::retry::ShardError;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The HEAD probe could not be performed (`status: None`) or returned a
    /// non-success status.
    #[error("probe of {url} failed: {reason}")]
    ProbeFailed {
        url: String,
        status: Option<u32>,
        reason: String,
    },

    /// The probe succeeded but the response carried no `Content-Length`.
    #[error("{url} did not declare a Content-Length")]
    LengthUnavailable { url: String },

    /// Probed or supplied length is zero or negative.
    #[error("invalid content length {0}")]
    InvalidLength(i64),

    #[error("invalid source URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid transfer options: {0}")]
    InvalidOptions(&'static str),

    /// A shard (or the sequential engine, `shard: None`) failed mid-stream.
    #[error("{}", transfer_failed_message(.shard, .source))]
    TransferFailed {
        shard: Option<usize>,
        #[source]
        source: ShardError,
    },

    /// The caller cancelled the transfer.
    #[error("transfer cancelled")]
    Cancelled,

    /// The blocking transfer task could not be joined.
    #[error("transfer worker failed: {0}")]
    Worker(String),
}

fn transfer_failed_message(shard: &Option<usize>, source: &ShardError) -> String {
    match shard {
        Some(index) => format!("transfer failed in shard {}: {}", index, source),
        None => format!("transfer failed: {}", source),
    }
}

impl TransferError {
    pub(crate) fn storage(source: std::io::Error) -> Self {
        TransferError::TransferFailed {
            shard: None,
            source: ShardError::Storage(source),
        }
    }

    /// Map a shard-level error to the transfer taxonomy, keeping cancellation distinct.
    pub(crate) fn from_shard(shard: Option<usize>, source: ShardError) -> Self {
        match source {
            ShardError::Cancelled => TransferError::Cancelled,
            source => TransferError::TransferFailed { shard, source },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }

    /// The origin answered but refused HEAD itself (405, 501), so a plain GET
    /// may still work. Transport failures and other statuses are not this.
    pub fn is_head_rejected(&self) -> bool {
        matches!(
            self,
            TransferError::ProbeFailed {
                status: Some(405 | 501),
                ..
            }
        )
    }
}
