//! Parallel sharded HTTP download engine.
//!
//! Splits a remote resource of known length into fixed-size byte ranges,
//! fetches them concurrently with ranged GETs, writes each at its offset in a
//! pre-sized destination file, and reports throttled aggregate progress.
//! Falls back to a single sequential stream when the origin cannot be sharded.

pub mod checksum;
pub mod config;
pub mod control;
pub mod downloader;
pub mod error;
pub mod fetch_head;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod storage;

pub use control::CancelToken;
pub use downloader::{fetch, fetch_async, Engine, ShardedDownloader, TransferOptions, TransferReport};
pub use error::TransferError;
pub use progress::DownloadStatus;
