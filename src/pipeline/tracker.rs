//! Completion tracking for submitted attachments.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Counter of attachments submitted but not yet fully handled.
///
/// Cloning yields another handle on the same counter. The driver calls
/// [`add`](Self::add) before handing a record to the queue; workers
/// release it through a [`CompletionGuard`].
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of pending work.
    pub fn add(&self) {
        *self.lock() += 1;
    }

    /// Mark one unit of work as finished.
    pub fn done(&self) {
        let mut pending = self.lock();
        debug_assert!(*pending > 0, "done() without matching add()");
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.inner.idle.notify_all();
        }
    }

    /// Guard that calls [`done`](Self::done) when dropped.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            tracker: self.clone(),
        }
    }

    /// Number of units still pending.
    pub fn pending(&self) -> usize {
        *self.lock()
    }

    /// Block until nothing is pending.
    pub fn wait(&self) {
        let pending = self.lock();
        let _idle = self
            .inner
            .idle
            .wait_while(pending, |p| *p > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until nothing is pending or `timeout` elapses.
    ///
    /// Returns `true` if the counter reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.lock();
        while *pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            pending = self
                .inner
                .idle
                .wait_timeout(pending, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // A panicking worker must not wedge the counter.
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases one unit of work on drop, including during unwinding.
#[derive(Debug)]
pub struct CompletionGuard {
    tracker: CompletionTracker,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
