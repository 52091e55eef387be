//! Cancellation for running transfers.
//!
//! A `CancelToken` is cloned into every shard task. Cancelling a token also
//! cancels every child token derived from it, so a transfer can abort its
//! own shards (on the first real failure) without touching the caller's token,
//! while a caller-side cancel still reaches every shard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    children: Mutex<Vec<Weak<Inner>>>,
    wake: Condvar,
}

impl Inner {
    fn cancel(&self) {
        // Holding the lock while setting the flag pairs with `wait_timeout`,
        // so a waiter cannot miss the notification.
        let children = {
            let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
            if self.cancelled.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *children)
        };
        self.wake.notify_all();
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// Shared cancellation signal. Cheap to clone; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// New token that is cancelled whenever `self` is, but can also be
    /// cancelled on its own without affecting `self`.
    pub fn child_token(&self) -> CancelToken {
        let child = CancelToken::new();
        {
            let mut children = self.inner.children.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_cancelled() {
                children.retain(|w| w.strong_count() > 0);
                children.push(Arc::downgrade(&child.inner));
                return child;
            }
        }
        child.cancel();
        child
    }

    /// Block for up to `timeout`, returning early if the token is cancelled.
    /// Returns true when cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.children.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .inner
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
