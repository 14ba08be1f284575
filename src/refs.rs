//! Reference roots (§4.3): the two external-root mechanisms GC consults, plus the
//! per-worker transient stacks that keep intermediate results of in-flight recursive
//! operations alive between allocations.

use crate::edge::Edge;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;

/// External reference counts, keyed by node index. A sharded `Mutex<HashMap<..>>` stands
/// in for the "lock-free sharded hash table" of §4.3: the shards bound lock contention to
/// whichever `ref`/`deref` calls happen to hash to the same shard, while keeping the
/// implementation a plain, auditable `HashMap` rather than a hand-rolled lock-free map.
pub struct RefCounts {
    shards: Vec<Mutex<HashMap<u64, u64, fxhash::FxBuildHasher>>>,
}

const SHARD_COUNT: usize = 64;

impl RefCounts {
    pub fn new() -> RefCounts {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || Mutex::new(HashMap::default()));
        RefCounts { shards }
    }

    #[inline]
    fn shard(&self, index: u64) -> &Mutex<HashMap<u64, u64, fxhash::FxBuildHasher>> {
        &self.shards[(index as usize) % SHARD_COUNT]
    }

    /// Increment the external reference count of `edge`'s node. Constants are ignored
    /// (§4.3): `true`/`false` are never collected and need no bookkeeping.
    pub fn reference(&self, edge: Edge) {
        if edge.is_constant() {
            return;
        }
        let mut shard = self.shard(edge.index()).lock();
        *shard.entry(edge.index()).or_insert(0) += 1;
    }

    /// Decrement the external reference count of `edge`'s node. Dropping to zero
    /// unregisters it as a root but does not itself free the slot — only GC does that.
    pub fn dereference(&self, edge: Edge) {
        if edge.is_constant() {
            return;
        }
        let mut shard = self.shard(edge.index()).lock();
        if let Some(count) = shard.get_mut(&edge.index()) {
            if *count <= 1 {
                shard.remove(&edge.index());
            } else {
                *count -= 1;
            }
        }
    }

    /// Iterate every node index currently holding a positive reference count. Used only
    /// by GC's mark phase, which runs stop-the-world, so no locking discipline beyond the
    /// shard mutex (uncontended at that point) is required.
    pub(crate) fn roots(&self, mut visit: impl FnMut(u64)) {
        for shard in &self.shards {
            for index in shard.lock().keys() {
                visit(*index);
            }
        }
    }
}

impl Default for RefCounts {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered memory location GC dereferences and marks during traversal, supporting
/// the "the edge variable itself is the root and is mutated in place" client idiom
/// (§4.3). The pointer is only ever read by GC while the owning thread has promised (by
/// calling `protect`/`unprotect` correctly) that the location is valid.
pub struct ProtectedPointers {
    pointers: Mutex<Vec<*const Edge>>,
}

// SAFETY: the raw pointers are only read during the stop-the-world GC barrier, at which
// point every worker (including whichever thread registered the pointer) is parked, so
// there is no concurrent mutation of the pointee while GC dereferences it.
unsafe impl Send for ProtectedPointers {}
unsafe impl Sync for ProtectedPointers {}

impl ProtectedPointers {
    pub fn new() -> ProtectedPointers {
        ProtectedPointers { pointers: Mutex::new(Vec::new()) }
    }

    /// Register `slot` as a GC root. *Safety*: `slot` must stay valid (the pointee may
    /// change, but the memory must not be freed or reused for something else) until a
    /// matching `unprotect` call.
    pub unsafe fn protect(&self, slot: *const Edge) {
        self.pointers.lock().push(slot);
    }

    pub fn unprotect(&self, slot: *const Edge) {
        let mut pointers = self.pointers.lock();
        if let Some(pos) = pointers.iter().rposition(|p| *p == slot) {
            pointers.remove(pos);
        }
    }

    pub(crate) fn roots(&self, mut visit: impl FnMut(Edge)) {
        for &ptr in self.pointers.lock().iter() {
            // SAFETY: see `protect`'s contract; GC only calls this while all workers are
            // parked, so no writer can be racing this read.
            let edge = unsafe { *ptr };
            visit(edge);
        }
    }
}

impl Default for ProtectedPointers {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    /// Transient edges produced mid-recursion that have not yet been folded into a
    /// `makenode` result or handed back to the caller. Every recursive DD operation
    /// pushes its cofactors/partial results here before any call that might allocate
    /// (and trigger GC), and pops them once they are safely referenced by something
    /// else (§4.3, §4.6).
    static REFS_STACK: RefCell<Vec<Edge>> = RefCell::new(Vec::with_capacity(256));
    /// Pending `spawn`ed task handles not yet `sync`ed, so GC can also mark results of
    /// in-flight spawns that have not returned to their parent frame yet.
    static SPAWN_STACK: RefCell<Vec<Edge>> = RefCell::new(Vec::with_capacity(64));
}

/// RAII guard that pushes `edge` onto this worker's refs stack on construction and pops
/// it on drop, so a recursive operation can safely keep an intermediate result alive
/// across a call that might provoke GC.
pub(crate) struct RefsGuard;

impl RefsGuard {
    #[inline]
    pub(crate) fn push(edge: Edge) -> RefsGuard {
        REFS_STACK.with(|stack| stack.borrow_mut().push(edge));
        RefsGuard
    }
}

impl Drop for RefsGuard {
    #[inline]
    fn drop(&mut self) {
        REFS_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn push_spawn_result(edge: Edge) {
    SPAWN_STACK.with(|stack| stack.borrow_mut().push(edge));
}

pub(crate) fn pop_spawn_result() {
    SPAWN_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Visit every edge on *this* thread's refs and spawn stacks. GC walks this for every
/// live worker while all of them are parked at the safe-point (§4.3).
pub(crate) fn visit_local_roots(mut visit: impl FnMut(Edge)) {
    REFS_STACK.with(|stack| {
        for edge in stack.borrow().iter() {
            visit(*edge);
        }
    });
    SPAWN_STACK.with(|stack| {
        for edge in stack.borrow().iter() {
            visit(*edge);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_and_deref_round_trip() {
        let counts = RefCounts::new();
        let e = Edge::from_index(10);
        counts.reference(e);
        counts.reference(e);
        let mut seen = Vec::new();
        counts.roots(|i| seen.push(i));
        assert_eq!(seen, vec![10]);
        counts.dereference(e);
        counts.dereference(e);
        let mut seen = Vec::new();
        counts.roots(|i| seen.push(i));
        assert!(seen.is_empty());
    }

    #[test]
    fn protected_pointer_is_visited() {
        let protected = ProtectedPointers::new();
        let edge = Edge::from_index(7);
        unsafe { protected.protect(&edge as *const Edge) };
        let mut seen = Vec::new();
        protected.roots(|e| seen.push(e));
        assert_eq!(seen, vec![edge]);
        protected.unprotect(&edge as *const Edge);
        let mut seen = Vec::new();
        protected.roots(|e| seen.push(e));
        assert!(seen.is_empty());
    }
}
