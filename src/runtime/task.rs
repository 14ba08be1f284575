//! `spawn`/`sync`: the fork half and the join half of §4.1's task pair.

use super::{Job, TaskRuntime};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// Identifies one of the `worker_count` pool slots a `together` broadcast dispatches to.
/// Not necessarily meaningful outside that context.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TaskIndex(pub(crate) usize);

impl TaskIndex {
    #[inline]
    pub fn get(&self) -> usize {
        self.0
    }
}

struct TaskCell<T> {
    value: Mutex<Option<T>>,
    cv: Condvar,
}

impl<T> TaskCell<T> {
    fn new() -> TaskCell<T> {
        TaskCell { value: Mutex::new(None), cv: Condvar::new() }
    }

    fn publish(&self, value: T) {
        let mut slot = self.value.lock();
        *slot = Some(value);
        self.cv.notify_all();
    }
}

/// A handle to a task's eventual result, returned by `spawn` and consumed by `sync`.
pub struct JoinHandle<T> {
    cell: Arc<TaskCell<T>>,
}

pub(crate) fn spawn<T: Send + 'static>(runtime: &Arc<TaskRuntime>, f: impl FnOnce() -> T + Send + 'static) -> JoinHandle<T> {
    let cell = Arc::new(TaskCell::new());
    let publish_cell = cell.clone();
    let job: Job = Box::new(move || {
        let result = f();
        publish_cell.publish(result);
    });
    runtime.push_local(job);
    JoinHandle { cell }
}

/// Block until `handle`'s task publishes a result. While waiting, the calling thread
/// keeps helping: it runs any other task it can steal (possibly its own spawned task, if
/// nobody stole it first — the common, uncontended fast path) rather than idling.
pub(crate) fn sync<T: Send + 'static>(runtime: &Arc<TaskRuntime>, handle: JoinHandle<T>) -> T {
    loop {
        {
            let mut slot = handle.cell.value.lock();
            if let Some(value) = slot.take() {
                return value;
            }
        }
        if runtime.run_one() {
            continue;
        }
        let mut slot = handle.cell.value.lock();
        if slot.is_some() {
            continue;
        }
        handle.cell.cv.wait_for(&mut slot, Duration::from_millis(1));
    }
}
