//! Progress aggregation for sharded transfers.
//!
//! Shard tasks report raw byte deltas concurrently; `ProgressAggregator`
//! folds them into one running total and forwards at most one snapshot per
//! report window to the caller's sink. The snapshot that completes the
//! transfer is never throttled and is emitted exactly once.

mod status;
mod throttle;

pub use status::{format_size, DownloadStatus};
pub use throttle::TokenBucket;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Minimum spacing between throttled snapshots (and between a shard's raw reports).
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(500);

struct Gate {
    window_start: Instant,
    finished: bool,
}

/// Merges concurrent raw progress deltas into a throttled, non-decreasing
/// `(bytes_done, content_length)` stream.
///
/// `report` is lock-free unless the window has elapsed or the transfer just
/// completed; only then does a caller take the gate, re-check, and emit.
pub struct ProgressAggregator<S, F, P> {
    content_length: u64,
    interval: Duration,
    origin: Instant,
    total: AtomicU64,
    /// Window start as nanoseconds since `origin`, for the unlocked fast path.
    window_start_nanos: AtomicU64,
    gate: Mutex<Gate>,
    status: F,
    sink: P,
    _status: PhantomData<fn() -> S>,
}

impl<S, F, P> ProgressAggregator<S, F, P>
where
    F: Fn(u64, u64) -> S,
    P: Fn(S),
{
    pub fn new(content_length: u64, interval: Duration, status: F, sink: P) -> Self {
        let origin = Instant::now();
        Self {
            content_length,
            interval,
            origin,
            total: AtomicU64::new(0),
            window_start_nanos: AtomicU64::new(0),
            gate: Mutex::new(Gate {
                window_start: origin,
                finished: false,
            }),
            status,
            sink,
            _status: PhantomData,
        }
    }

    /// Add `delta` bytes to the running total and emit a snapshot if the
    /// window has elapsed or the total reached the content length.
    pub fn report(&self, delta: u64) {
        let total = self.total.fetch_add(delta, Ordering::AcqRel) + delta;
        if total < self.content_length && !self.window_elapsed() {
            return;
        }

        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if gate.finished {
            return;
        }
        let done = self.total.load(Ordering::Acquire).min(self.content_length);
        let complete = done == self.content_length;
        if !complete && gate.window_start.elapsed() < self.interval {
            // Another caller emitted while we waited for the gate.
            return;
        }

        (self.sink)((self.status)(done, self.content_length));

        // The window restarts after the sink returns so consecutive snapshots
        // are at least `interval` apart as observed by the sink.
        let now = Instant::now();
        gate.window_start = now;
        gate.finished = complete;
        self.window_start_nanos
            .store(now.duration_since(self.origin).as_nanos() as u64, Ordering::Release);
    }

    /// Bytes reported so far (may exceed what has been emitted).
    pub fn bytes_done(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// True once the completing snapshot has been emitted.
    pub fn is_finished(&self) -> bool {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner).finished
    }

    fn window_elapsed(&self) -> bool {
        let start = Duration::from_nanos(self.window_start_nanos.load(Ordering::Acquire));
        self.origin.elapsed().saturating_sub(start) >= self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    type Emitted = Arc<Mutex<Vec<(Instant, u64, u64)>>>;

    fn recording_sink(out: &Emitted) -> impl Fn((u64, u64)) + Send + Sync {
        let out = Arc::clone(out);
        move |(done, total)| out.lock().unwrap().push((Instant::now(), done, total))
    }

    #[test]
    fn completion_is_emitted_immediately() {
        let out: Emitted = Arc::default();
        let agg = ProgressAggregator::new(
            100,
            Duration::from_secs(3600),
            |done, total| (done, total),
            recording_sink(&out),
        );
        agg.report(40);
        agg.report(0);
        assert!(out.lock().unwrap().is_empty(), "throttled inside the window");
        agg.report(60);
        let out = out.lock().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].1, out[0].2), (100, 100));
        assert!(agg.is_finished());
    }

    #[test]
    fn no_duplicate_final_snapshot() {
        let out: Emitted = Arc::default();
        let agg = ProgressAggregator::new(10, Duration::ZERO, |d, t| (d, t), recording_sink(&out));
        agg.report(10);
        agg.report(0);
        agg.report(0);
        let finals = out.lock().unwrap().iter().filter(|e| e.1 == 10).count();
        assert_eq!(finals, 1);
    }

    #[test]
    fn snapshots_after_window_elapses() {
        let out: Emitted = Arc::default();
        let agg = ProgressAggregator::new(
            1000,
            Duration::from_millis(200),
            |d, t| (d, t),
            recording_sink(&out),
        );
        agg.report(1);
        thread::sleep(Duration::from_millis(250));
        agg.report(1);
        let out = out.lock().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, 2);
    }

    #[test]
    fn concurrent_reporters_stay_monotonic_and_throttled() {
        const THREADS: u64 = 8;
        const EVENTS: u64 = 2_000;
        const DELTA: u64 = 3;
        let interval = Duration::from_millis(5);
        let content_length = THREADS * EVENTS * DELTA;

        let out: Emitted = Arc::default();
        let agg = ProgressAggregator::new(content_length, interval, |d, t| (d, t), recording_sink(&out));

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for i in 0..EVENTS {
                        agg.report(DELTA);
                        if i % 200 == 0 {
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                });
            }
        });

        let out = out.lock().unwrap();
        assert!(!out.is_empty());
        assert!(out.windows(2).all(|w| w[0].1 <= w[1].1), "totals must not decrease");
        assert!(out.iter().all(|e| e.1 <= content_length && e.2 == content_length));
        assert_eq!(out.last().unwrap().1, content_length);
        assert_eq!(out.iter().filter(|e| e.1 == content_length).count(), 1);
        for w in out.windows(2) {
            if w[1].1 != content_length {
                assert!(w[1].0.duration_since(w[0].0) >= interval, "snapshots closer than the window");
            }
        }
    }

    #[test]
    fn status_factory_shapes_snapshots() {
        let out = Mutex::new(Vec::new());
        let agg = ProgressAggregator::new(
            4,
            Duration::ZERO,
            |done, total| format!("{}/{}", done, total),
            |s: String| out.lock().unwrap().push(s),
        );
        agg.report(1);
        agg.report(3);
        assert_eq!(*out.lock().unwrap(), vec!["1/4".to_string(), "4/4".to_string()]);
    }
}
