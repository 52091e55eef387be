//! Optional per-shard retry and backoff policy.
//!
//! Transfers do not retry unless a `RetryPolicy` is supplied. This module
//! classifies failures (timeouts, throttling, connection errors) and decides
//! exponential backoff; every shard of a transfer shares one policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::ShardError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
