//! Fixed-size worker pool fed by a priority queue.
//!
//! Jobs run to completion on one thread each. Higher priorities are always
//! dequeued first and jobs of equal priority run in submission order. Each
//! worker thread owns its RNG, handed to every job it runs.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;
use std::any::Any;
use std::collections::BinaryHeap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

use crate::node::lock;

/// Scheduling priority of a pool job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Highest = 0,
    High = 1,
    Medium = 2,
    Low = 3,
    Lowest = 4,
}

type Job = Box<dyn FnOnce(&mut ChaCha20Rng) + Send + 'static>;

struct QueuedJob {
    priority: Priority,
    seq: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    // Max-heap: the "greatest" job is the most urgent, then the oldest
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct PoolState {
    queue: BinaryHeap<QueuedJob>,
    next_seq: u64,
    active: usize,
    shutdown: bool,
}

#[derive(Default)]
struct PoolShared {
    state: Mutex<PoolState>,
    work_ready: Condvar,
    idle: Condvar,
}

impl PoolShared {
    fn execute(&self, priority: Priority, job: Job) -> bool {
        let mut state = lock(&self.state);
        if state.shutdown {
            return false;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(QueuedJob { priority, seq, job });
        drop(state);
        self.work_ready.notify_one();
        true
    }

    fn cancel_pending(&self) -> usize {
        let drained: Vec<QueuedJob> = {
            let mut state = lock(&self.state);
            let drained = state.queue.drain().collect();
            if state.active == 0 {
                self.idle.notify_all();
            }
            drained
        };
        // Captured state is dropped outside the lock
        drained.len()
    }
}

/// A fixed pool of search threads.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n_threads` workers. With a `seed`, worker `i` seeds its RNG
    /// with `seed + i`; otherwise from entropy.
    pub fn new(n_threads: usize, seed: Option<u64>) -> io::Result<Self> {
        let shared = Arc::new(PoolShared::default());
        let mut workers = Vec::with_capacity(n_threads);

        for index in 0..n_threads {
            let shared = Arc::clone(&shared);
            let rng = match seed {
                Some(seed) => ChaCha20Rng::seed_from_u64(seed.wrapping_add(index as u64)),
                None => ChaCha20Rng::from_entropy(),
            };
            let handle = thread::Builder::new()
                .name(format!("mcts-worker-{index}"))
                .spawn(move || worker_loop(&shared, rng))?;
            workers.push(handle);
        }

        debug!(n_threads, "Worker pool started");
        Ok(Self { shared, workers })
    }

    #[inline]
    pub fn n_threads(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job. Returns `false` once the pool is shutting down.
    pub fn execute<J>(&self, priority: Priority, job: J) -> bool
    where
        J: FnOnce(&mut ChaCha20Rng) + Send + 'static,
    {
        self.shared.execute(priority, Box::new(job))
    }

    /// Drop every job that has not started yet. Returns how many were dropped.
    pub fn cancel_pending(&self) -> usize {
        self.shared.cancel_pending()
    }

    /// Jobs queued but not started.
    pub fn pending(&self) -> usize {
        lock(&self.shared.state).queue.len()
    }

    /// Block until the queue is empty and no job is running.
    pub fn wait_idle(&self) {
        let mut state = lock(&self.shared.state);
        while state.active > 0 || !state.queue.is_empty() {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Weak handle for submitting jobs from inside jobs or listeners.
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut state = lock(&self.shared.state);
            state.shutdown = true;
            state.queue.clear();
        }
        self.shared.work_ready.notify_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker thread terminated abnormally");
            }
        }
        debug!("Worker pool stopped");
    }
}

/// Non-owning handle to a [`WorkerPool`]. Calls become no-ops once the
/// pool is gone.
#[derive(Clone, Default)]
pub struct PoolHandle {
    shared: Weak<PoolShared>,
}

impl PoolHandle {
    pub fn execute<J>(&self, priority: Priority, job: J) -> bool
    where
        J: FnOnce(&mut ChaCha20Rng) + Send + 'static,
    {
        match self.shared.upgrade() {
            Some(shared) => shared.execute(priority, Box::new(job)),
            None => false,
        }
    }

    pub fn cancel_pending(&self) -> usize {
        self.shared.upgrade().map_or(0, |s| s.cancel_pending())
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic".to_string())
}

fn worker_loop(shared: &PoolShared, mut rng: ChaCha20Rng) {
    loop {
        let job = {
            let mut state = lock(&shared.state);
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(queued) = state.queue.pop() {
                    state.active += 1;
                    break queued.job;
                }
                state = shared
                    .work_ready
                    .wait(state)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(&mut rng))) {
            error!(panic = %panic_message(&*payload), "Pool job panicked");
        }

        let mut state = lock(&shared.state);
        state.active -= 1;
        if state.active == 0 && state.queue.is_empty() {
            shared.idle.notify_all();
        }
    }
}
