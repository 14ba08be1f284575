//! The shared, lock-free operation cache (§4.4): a lossy, direct-mapped memoization
//! table for recursive DD operations, wiped wholesale on every GC.
//!
//! Each line uses an optimistic seqlock: writers bump an odd "in progress" sequence
//! number, write the five payload words, then publish an even sequence number. Readers
//! snapshot the sequence before and after reading the payload and discard the read (as a
//! miss, not an error — the cache is lossy by design, §4.4) if it changed. There is no
//! locking and no retry loop beyond the one re-check; losing a race just costs a
//! recomputation, never a wrong answer.

use crate::edge::Edge;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dense small integers so distinct operations never collide by coincidence of operand
/// values alone (§4.4: "the cache key includes the opcode").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u64)]
pub(crate) enum Opcode {
    Ite = 1,
    Exists = 2,
    Forall = 3,
    RelNext = 4,
    RelPrev = 5,
    SatCount = 6,
    Compose = 7,
    Rename = 8,
    Support = 9,
    PathCount = 10,
    /// Saturation's `go_sat(set, idx)` recursion (§4.7) — `idx` rides in the `b` operand.
    Saturate = 11,
}

struct Line {
    /// Even = stable/published, odd = write in progress. Zero means "never written".
    seq: AtomicU64,
    opcode: AtomicU64,
    a: AtomicU64,
    b: AtomicU64,
    c: AtomicU64,
    result: AtomicU64,
}

impl Line {
    const fn empty() -> Line {
        Line {
            seq: AtomicU64::new(0),
            opcode: AtomicU64::new(0),
            a: AtomicU64::new(0),
            b: AtomicU64::new(0),
            c: AtomicU64::new(0),
            result: AtomicU64::new(0),
        }
    }
}

pub struct OperationCache {
    lines: Box<[Line]>,
    mask: u64,
}

impl OperationCache {
    pub fn new(capacity_log2: u32) -> OperationCache {
        let capacity = 1usize << capacity_log2;
        let mut lines = Vec::with_capacity(capacity);
        lines.resize_with(capacity, Line::empty);
        OperationCache { lines: lines.into_boxed_slice(), mask: (capacity as u64) - 1 }
    }

    #[inline]
    fn index(&self, opcode: Opcode, a: Edge, b: Edge, c: Edge) -> usize {
        let h = crate::table::fnv_mix((opcode as u64 ^ a.raw(), b.raw() ^ c.raw().rotate_left(17)), 0x9e37_79b9_7f4a_7c15);
        (h & self.mask) as usize
    }

    /// Returns the memoized result for `(opcode, a, b, c)`, or `None` on a miss — which
    /// includes both "never computed" and "lost a race with a concurrent writer". Callers
    /// must never depend on this returning `Some` (§4.4: correctness never depends on
    /// hitting the cache).
    pub(crate) fn get(&self, opcode: Opcode, a: Edge, b: Edge, c: Edge) -> Option<Edge> {
        let line = &self.lines[self.index(opcode, a, b, c)];
        let s1 = line.seq.load(Ordering::Acquire);
        if s1 == 0 || s1 & 1 != 0 {
            return None;
        }
        let o = line.opcode.load(Ordering::Relaxed);
        let la = line.a.load(Ordering::Relaxed);
        let lb = line.b.load(Ordering::Relaxed);
        let lc = line.c.load(Ordering::Relaxed);
        let result = line.result.load(Ordering::Relaxed);
        let s2 = line.seq.load(Ordering::Acquire);
        if s1 != s2 {
            return None;
        }
        if o == opcode as u64 && la == a.raw() && lb == b.raw() && lc == c.raw() {
            Some(Edge::from_raw(result))
        } else {
            None
        }
    }

    /// Unconditionally overwrites whatever was in this line's slot (§4.4: "lossy cache —
    /// overwrite on collision"). The three-valued "existed/created/replaced" distinction
    /// the original engine exposed collapses here to a single store-and-forget, per the
    /// resolved open question in DESIGN.md.
    pub(crate) fn put(&self, opcode: Opcode, a: Edge, b: Edge, c: Edge, result: Edge) {
        let line = &self.lines[self.index(opcode, a, b, c)];
        let s = line.seq.fetch_add(1, Ordering::AcqRel); // now odd: write in progress
        line.opcode.store(opcode as u64, Ordering::Relaxed);
        line.a.store(a.raw(), Ordering::Relaxed);
        line.b.store(b.raw(), Ordering::Relaxed);
        line.c.store(c.raw(), Ordering::Relaxed);
        line.result.store(result.raw(), Ordering::Relaxed);
        line.seq.store(s.wrapping_add(2), Ordering::Release); // back to even, new version
    }

    /// Reset every line to "never written". Called on every GC (§4.4) because cached
    /// result edges may reference table slots the sweep is about to reclaim.
    pub(crate) fn clear(&self) {
        for line in self.lines.iter() {
            line.seq.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_hits() {
        let cache = OperationCache::new(8);
        let a = Edge::from_index(1);
        let b = Edge::from_index(2);
        let c = Edge::from_index(3);
        let r = Edge::from_index(4);
        cache.put(Opcode::Ite, a, b, c, r);
        assert_eq!(cache.get(Opcode::Ite, a, b, c), Some(r));
        assert_eq!(cache.get(Opcode::Exists, a, b, c), None);
    }

    #[test]
    fn clear_evicts_everything() {
        let cache = OperationCache::new(8);
        let a = Edge::from_index(1);
        cache.put(Opcode::Ite, a, a, a, a);
        cache.clear();
        assert_eq!(cache.get(Opcode::Ite, a, a, a), None);
    }
}
