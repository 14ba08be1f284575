//! The work-stealing fork-join task runtime (§4.1).
//!
//! A fixed pool of OS threads, each owning a [`crossbeam_deque::Worker`] deque of
//! closure-free... well, closures — the spec's "closure-free task frames" are a C-level
//! concern (task structs vs. function pointers); in Rust the idiomatic equivalent is a
//! boxed `FnOnce`, which is what every retrieval-pack example reaches for when it needs a
//! type-erased unit of work. `spawn`/`sync` implement the classic work-stealing join: a
//! `spawn`ed job either gets run locally by the thread that just pushed it (the common,
//! uncontended case) or gets stolen and the spawning thread helps drain other work while
//! it waits. `together` is a broadcast-and-barrier used by GC and by one-time per-worker
//! setup.

mod pool;
mod task;

pub(crate) use task::{JoinHandle, TaskIndex};

use crossbeam_deque::{Injector, Stealer, Worker};
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// The process-wide task runtime. One instance lives inside [`crate::manager::Manager`]
/// for the lifetime between `init` and `quit`.
pub struct TaskRuntime {
    injector: Injector<Job>,
    stealers: Vec<Stealer<Job>>,
    handles: Mutex<Vec<std::thread::JoinHandle<()>>>,
    shutdown: AtomicBool,
    /// Safe-point flag: workers check this between tasks and, when set, park at the GC
    /// barrier instead of picking up more work (§4.1, §5).
    pub(crate) gc_requested: AtomicBool,
    parked: Mutex<usize>,
    parked_cv: Condvar,
    broadcast: pool::Broadcast,
    worker_count: usize,
}

thread_local! {
    /// Each thread that ever calls `spawn` — pool worker or the external caller thread —
    /// lazily gets its own local deque, registered dynamically with the runtime so
    /// non-pool threads can participate in stealing too (Sylvan's "the calling thread is
    /// also a worker" convention, adapted to Rust's more dynamic thread model).
    static LOCAL: RefCell<Option<Worker<Job>>> = RefCell::new(None);
}

impl TaskRuntime {
    /// Start `worker_count` background worker threads (0 = autodetect via
    /// `std::thread::available_parallelism`).
    pub fn start(worker_count: usize, on_worker_start: Arc<dyn Fn(usize) + Send + Sync>) -> Arc<TaskRuntime> {
        let worker_count = if worker_count == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            worker_count
        };

        let mut workers = Vec::with_capacity(worker_count);
        let mut stealers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let w = Worker::new_fifo();
            stealers.push(w.stealer());
            workers.push(w);
        }

        let runtime = Arc::new(TaskRuntime {
            injector: Injector::new(),
            stealers,
            handles: Mutex::new(Vec::with_capacity(worker_count)),
            shutdown: AtomicBool::new(false),
            gc_requested: AtomicBool::new(false),
            parked: Mutex::new(0),
            parked_cv: Condvar::new(),
            broadcast: pool::Broadcast::new(worker_count),
            worker_count,
        });

        let mut handles = Vec::with_capacity(worker_count);
        for (id, worker) in workers.into_iter().enumerate() {
            let runtime = runtime.clone();
            let on_start = on_worker_start.clone();
            handles.push(std::thread::Builder::new()
                .name(format!("sylvan-worker-{}", id))
                .spawn(move || {
                    on_start(id);
                    pool::run_worker(runtime, id, worker);
                })
                .expect("failed to spawn worker thread"));
        }
        *runtime.handles.lock() = handles;

        runtime
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake_all();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for h in handles {
            let _ = h.join();
        }
    }

    #[inline]
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn wake_all(&self) {
        self.parked_cv.notify_all();
    }

    /// Push `job` onto the calling thread's local deque, lazily creating one (for this
    /// thread only) if this is the first spawn it has ever issued.
    ///
    /// This deque's `Stealer` half is never published anywhere, so — unlike a pool
    /// worker's deque, whose `Stealer` is registered in `self.stealers` at startup — jobs
    /// pushed here are only ever visible to *this* thread's own `run_one` (`LOCAL` is
    /// checked before the shared injector/stealers). That is safe for the `spawn`/`call`/
    /// `sync` pattern every recursive operation uses, since a thread only ever `sync`s a
    /// handle for a job it itself just spawned and so always drains its own deque while
    /// waiting; it does mean a non-pool caller thread cannot offload work onto idle pool
    /// workers, only the other way around.
    pub(crate) fn push_local(self: &Arc<Self>, job: Job) {
        LOCAL.with(|local| {
            let mut local = local.borrow_mut();
            if local.is_none() {
                *local = Some(Worker::new_fifo());
            }
            local.as_ref().unwrap().push(job);
        });
        self.wake_all();
    }

    /// Try to run one job: prefer this thread's own local deque (the fast, uncontended
    /// path), then steal from the global injector, then steal from a pool worker.
    /// Returns `true` if a job was found and run.
    pub(crate) fn run_one(self: &Arc<Self>) -> bool {
        let ran_local = LOCAL.with(|local| {
            if let Some(job) = local.borrow().as_ref().and_then(|w| w.pop()) {
                job();
                true
            } else {
                false
            }
        });
        if ran_local {
            return true;
        }
        loop {
            match self.injector.steal() {
                crossbeam_deque::Steal::Success(job) => {
                    job();
                    return true;
                }
                crossbeam_deque::Steal::Retry => continue,
                crossbeam_deque::Steal::Empty => break,
            }
        }
        for stealer in &self.stealers {
            loop {
                match stealer.steal() {
                    crossbeam_deque::Steal::Success(job) => {
                        job();
                        return true;
                    }
                    crossbeam_deque::Steal::Retry => continue,
                    crossbeam_deque::Steal::Empty => break,
                }
            }
        }
        false
    }

    /// Broadcast `f` to every worker exactly once and block until all have returned
    /// (§4.1). Used for the GC barrier and for one-time per-thread setup.
    pub fn together(self: &Arc<Self>, f: impl Fn(TaskIndex) + Send + Sync + 'static) {
        self.broadcast.run(self, Arc::new(f));
    }
}

/// Spawn `f` as a task the calling thread may either run itself (if nobody steals it
/// first) or wait on (if it does get stolen). Mirrors `spawn`/`sync` in §4.1: the typical
/// call shape is `let h = spawn(|| low_subproblem()); let high = call(|| high_subproblem());
/// let low = sync(h);`.
pub(crate) fn spawn<T: Send + 'static>(runtime: &Arc<TaskRuntime>, f: impl FnOnce() -> T + Send + 'static) -> JoinHandle<T> {
    task::spawn(runtime, f)
}

/// Run `f` inline, without scheduling — the "high" half of the usual spawn/call/sync
/// triple.
#[inline]
pub(crate) fn call<T>(f: impl FnOnce() -> T) -> T {
    f()
}

/// Block until `handle`'s task has completed, helping drain other work in the meantime.
pub(crate) fn sync<T: Send + 'static>(runtime: &Arc<TaskRuntime>, handle: JoinHandle<T>) -> T {
    task::sync(runtime, handle)
}
