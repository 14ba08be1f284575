//! The pool-worker main loop and the `together` broadcast barrier.

use super::task::TaskIndex;
use super::{Job, TaskRuntime};
use crossbeam_deque::Worker;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A worker thread's body: register its deque as the thread-local `LOCAL` so the shared
/// `push_local`/`run_one` helpers operate on exactly the deque whose `Stealer` half was
/// published to the runtime at startup, then loop draining work until shutdown.
pub(crate) fn run_worker(runtime: Arc<TaskRuntime>, id: usize, worker: Worker<Job>) {
    super::LOCAL.with(|local| *local.borrow_mut() = Some(worker));
    loop {
        if runtime.is_shutdown() {
            return;
        }
        runtime.broadcast.poll(TaskIndex(id));
        if runtime.run_one() {
            continue;
        }
        if runtime.is_shutdown() {
            return;
        }
        let mut parked = runtime.parked.lock();
        *parked += 1;
        runtime.parked_cv.wait_for(&mut parked, Duration::from_millis(5));
        *parked -= 1;
    }
}

/// A one-shot broadcast-and-barrier, re-armed on every `together` call (§4.1). Each of
/// the `worker_count` pool threads runs the pending job exactly once per epoch and the
/// caller blocks until all of them have reported in — this is the mechanism both the GC
/// safe-point and one-time per-worker setup are built on.
pub(crate) struct Broadcast {
    epoch: AtomicU64,
    slot: Mutex<Option<Arc<dyn Fn(TaskIndex) + Send + Sync>>>,
    worker_count: usize,
    arrived: Mutex<usize>,
    done_cv: Condvar,
    last_seen: Vec<AtomicU64>,
}

impl Broadcast {
    pub(crate) fn new(worker_count: usize) -> Broadcast {
        let mut last_seen = Vec::with_capacity(worker_count);
        last_seen.resize_with(worker_count, || AtomicU64::new(0));
        Broadcast {
            epoch: AtomicU64::new(0),
            slot: Mutex::new(None),
            worker_count,
            arrived: Mutex::new(0),
            done_cv: Condvar::new(),
            last_seen,
        }
    }

    /// Called by a pool worker between tasks. Runs the pending broadcast job at most
    /// once per epoch per worker, then counts itself as arrived.
    pub(crate) fn poll(&self, id: TaskIndex) {
        let epoch = self.epoch.load(Ordering::Acquire);
        if epoch == 0 {
            return;
        }
        let seen = &self.last_seen[id.0];
        if seen.load(Ordering::Acquire) >= epoch {
            return;
        }
        let job = self.slot.lock().clone();
        if let Some(job) = job {
            job(id);
        }
        seen.store(epoch, Ordering::Release);
        let mut arrived = self.arrived.lock();
        *arrived += 1;
        if *arrived == self.worker_count {
            self.done_cv.notify_all();
        }
    }

    /// Arm a new epoch with `f` and block until every pool worker has executed it once.
    pub(crate) fn run(&self, runtime: &Arc<TaskRuntime>, f: Arc<dyn Fn(TaskIndex) + Send + Sync>) {
        if self.worker_count == 0 {
            return;
        }
        {
            let mut arrived = self.arrived.lock();
            *arrived = 0;
            *self.slot.lock() = Some(f);
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);
        runtime.wake_all();

        let mut arrived = self.arrived.lock();
        while *arrived < self.worker_count {
            let result = self.done_cv.wait_for(&mut arrived, Duration::from_millis(5));
            if result.timed_out() {
                runtime.wake_all();
            }
        }
        *self.slot.lock() = None;
    }
}
