//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::ShardError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

/// Runs `f` until it succeeds or the retry policy says to stop.
/// `f` receives the 1-based attempt number. Backoff waits wake up early when
/// `cancel` fires, in which case `ShardError::Cancelled` is returned.
pub fn run_with_retry<F>(policy: &RetryPolicy, cancel: &CancelToken, mut f: F) -> Result<(), ShardError>
where
    F: FnMut(u32) -> Result<(), ShardError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(()) => return Ok(()),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, error = %e, delay_ms = d.as_millis() as u64, "retrying after backoff");
                        if cancel.wait_timeout(d) {
                            return Err(ShardError::Cancelled);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
