//! Completion listeners.
//!
//! A listener counts finished iterations and decides when the search stops.
//! Stopping happens exactly once: queued iterations are cancelled and the
//! controller blocked in [`SearchListener::wait_for_finish`] is released.

use crate::node::lock;
use crate::pool::PoolHandle;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// One-shot latch.
#[derive(Debug, Default)]
pub struct Completion {
    fired: Mutex<bool>,
    cv: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the latch. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        let mut fired = lock(&self.fired);
        if *fired {
            return false;
        }
        *fired = true;
        self.cv.notify_all();
        true
    }

    pub fn is_fired(&self) -> bool {
        *lock(&self.fired)
    }

    pub fn wait(&self) {
        let mut fired = lock(&self.fired);
        while !*fired {
            fired = self.cv.wait(fired).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wait at most `timeout`. Returns whether the latch has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = lock(&self.fired);
        let (fired, _) = self
            .cv
            .wait_timeout_while(guard, timeout, |fired| !*fired)
            .unwrap_or_else(PoisonError::into_inner);
        *fired
    }
}

/// Tracks a running search and stops it.
pub trait SearchListener: Send + Sync {
    /// Record one finished iteration, successful or not.
    fn increment(&self);

    fn has_finished(&self) -> bool;

    /// Block until the stop condition fires.
    fn wait_for_finish(&self);

    /// Iterations recorded so far.
    fn iterations(&self) -> u32;
}

/// Shared stop action: cancel queued work, then release waiters.
#[derive(Debug)]
struct Stopper {
    completion: Completion,
    pool: PoolHandle,
}

impl Stopper {
    fn new(pool: PoolHandle) -> Self {
        Self {
            completion: Completion::new(),
            pool,
        }
    }

    fn stop(&self, iterations: u32) {
        if self.completion.is_fired() {
            return;
        }
        let cancelled = self.pool.cancel_pending();
        if self.completion.fire() {
            debug!(iterations, cancelled, "Search finished");
        }
    }
}

/// Stops after a fixed number of iterations.
#[derive(Debug)]
pub struct IterationListener {
    counter: AtomicU32,
    target: u32,
    stopper: Stopper,
}

impl IterationListener {
    /// A zero budget is finished from the start.
    pub fn new(target: u32, pool: PoolHandle) -> Self {
        let listener = Self {
            counter: AtomicU32::new(0),
            target,
            stopper: Stopper::new(pool),
        };
        if target == 0 {
            listener.stopper.stop(0);
        }
        listener
    }
}

impl SearchListener for IterationListener {
    fn increment(&self) {
        let n = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        if n == self.target {
            self.stopper.stop(n);
        }
    }

    fn has_finished(&self) -> bool {
        self.stopper.completion.is_fired()
    }

    fn wait_for_finish(&self) {
        self.stopper.completion.wait();
    }

    fn iterations(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }
}

/// Stops once a wall-clock budget is spent, or at a hard iteration ceiling,
/// whichever comes first.
#[derive(Debug)]
pub struct TimeListener {
    counter: AtomicU32,
    ceiling: u32,
    limit: Duration,
    start: Instant,
    stopper: Stopper,
}

impl TimeListener {
    pub fn new(limit: Duration, ceiling: u32, pool: PoolHandle) -> Self {
        let listener = Self {
            counter: AtomicU32::new(0),
            ceiling,
            limit,
            start: Instant::now(),
            stopper: Stopper::new(pool),
        };
        if ceiling == 0 || limit.is_zero() {
            listener.stopper.stop(0);
        }
        listener
    }

    #[inline]
    fn expired(&self) -> bool {
        self.start.elapsed() >= self.limit
    }
}

impl SearchListener for TimeListener {
    fn increment(&self) {
        let n = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        if n >= self.ceiling || self.expired() {
            self.stopper.stop(n);
        }
    }

    fn has_finished(&self) -> bool {
        self.stopper.completion.is_fired()
    }

    fn wait_for_finish(&self) {
        // The deadline passes even if no iteration completes to notice it
        let remaining = self.limit.saturating_sub(self.start.elapsed());
        if !self.stopper.completion.wait_timeout(remaining) {
            self.stopper.stop(self.iterations());
        }
    }

    fn iterations(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }
}

/// Records one iteration on drop, so the count advances even when the
/// iteration fails or panics.
pub(crate) struct CompletionGuard<'a> {
    listener: &'a dyn SearchListener,
}

impl<'a> CompletionGuard<'a> {
    pub(crate) fn new(listener: &'a dyn SearchListener) -> Self {
        Self { listener }
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.listener.increment();
    }
}
