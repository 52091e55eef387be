//! Sequential copy engine: one reader, one writer, one buffer.
//!
//! Progress is throttled by a token bucket (capacity 1, one token per second)
//! instead of the shared counter the sharded engine needs, since there is only
//! one writer. Status factory contract: `(bytes_since_last_report, bytes_copied)`.

use std::io::{self, Read, Write};
use std::marker::PhantomData;

use crate::control::CancelToken;
use crate::progress::TokenBucket;
use crate::retry::ShardError;

/// Push-style sequential copier. Feed it chunks in order; it writes them to
/// `dest` and emits throttled progress. `finish` always emits a final event.
pub struct StreamCopier<W, S, F, P> {
    dest: W,
    limiter: TokenBucket,
    status: F,
    sink: P,
    since_last_report: u64,
    copied: u64,
    _status: PhantomData<fn() -> S>,
}

impl<W, S, F, P> StreamCopier<W, S, F, P>
where
    W: Write,
    F: Fn(u64, u64) -> S,
    P: Fn(S),
{
    pub fn new(dest: W, status: F, sink: P) -> Self {
        Self::with_limiter(dest, TokenBucket::per_second(), status, sink)
    }

    pub fn with_limiter(dest: W, limiter: TokenBucket, status: F, sink: P) -> Self {
        Self {
            dest,
            limiter,
            status,
            sink,
            since_last_report: 0,
            copied: 0,
            _status: PhantomData,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.dest.write_all(chunk)?;
        let len = chunk.len() as u64;
        self.copied += len;
        self.since_last_report += len;
        if self.limiter.try_acquire() {
            self.emit();
        }
        Ok(())
    }

    pub fn copied(&self) -> u64 {
        self.copied
    }

    /// Flush, emit the final event unconditionally, and hand back the writer.
    pub fn finish(mut self) -> io::Result<(u64, W)> {
        self.dest.flush()?;
        self.emit();
        Ok((self.copied, self.dest))
    }

    fn emit(&mut self) {
        (self.sink)((self.status)(self.since_last_report, self.copied));
        self.since_last_report = 0;
    }
}

/// Copy `source` to `dest` until EOF using one `buffer_size` buffer.
/// Returns the byte count and the writer.
pub fn copy_stream<R, W, S, F, P>(
    source: &mut R,
    dest: W,
    buffer_size: usize,
    status: F,
    sink: P,
    cancel: &CancelToken,
) -> Result<(u64, W), ShardError>
where
    R: Read,
    W: Write,
    F: Fn(u64, u64) -> S,
    P: Fn(S),
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut copier = StreamCopier::new(dest, status, sink);
    loop {
        if cancel.is_cancelled() {
            return Err(ShardError::Cancelled);
        }
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ShardError::Storage(e)),
        };
        copier.feed(&buf[..n])?;
    }
    Ok(copier.finish()?)
}
