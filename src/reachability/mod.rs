//! Reachability fixpoint strategies (§4.7): `bfs`, `par`, and `sat` (saturation/chaining)
//! driving `relnext` over a partitioned transition relation, plus deadlock detection.
//!
//! All three strategies compute the same least fixpoint `S* = μX. S₀ ∪ relnext(X, R[*],
//! *)` and return bit-equal edges for the same input regardless of worker count or
//! strategy (§8 "Reachability"); they differ only in how the union over partitions (and,
//! for `sat`, the fixpoint itself) is scheduled.

mod sat;

pub use sat::sat;

use crate::edge::Edge;
use crate::manager::manager;
use crate::ops::{and, diff, or, relnext, relprev};
use crate::refs::RefsGuard;
use std::sync::Arc;

/// One partition of a transition relation: its own edge plus the cube of variables
/// `relnext`/`relprev` should quantify for this partition (§4.7).
#[derive(Copy, Clone)]
pub struct Partition {
    pub relation: Edge,
    pub vars: Edge,
}

/// Outcome of a `bfs`/`par`/`sat` run.
pub struct Reached {
    /// The fixpoint `S*`.
    pub visited: Edge,
    /// States with no successor under any partition, if deadlock detection was requested
    /// and a non-empty set was found. Per §4.7, reporting stops at the first non-empty
    /// finding, so this is at most one level's worth of deadlock states.
    pub deadlocks: Option<Edge>,
    pub levels: u32,
}

enum Mode {
    Bfs,
    Par,
}

/// Breadth-first level expansion: each level's union over partitions is folded
/// sequentially (single-threaded scheduling), though `relnext` itself still runs its own
/// internal work-stealing recursion (§4.7 "parallel inside each op").
pub fn bfs(initial: Edge, partitions: &[Partition], detect_deadlocks: bool) -> Reached {
    run(Mode::Bfs, initial, partitions, detect_deadlocks)
}

/// Parallel level expansion: the union over partitions is computed by a divide-and-conquer
/// tree that spawns the left half and calls the right half inline (§4.7). Returns the same
/// fixpoint as `bfs`, only the wall-clock schedule differs.
pub fn par(initial: Edge, partitions: &[Partition], detect_deadlocks: bool) -> Reached {
    run(Mode::Par, initial, partitions, detect_deadlocks)
}

fn run(mode: Mode, initial: Edge, partitions: &[Partition], detect_deadlocks: bool) -> Reached {
    let partitions: Arc<[Partition]> = partitions.into();
    let mut visited = initial;
    let mut next_level = initial;
    let mut levels = 0u32;
    let mut found_deadlocks = None;
    let mut tracking = detect_deadlocks;

    while !next_level.is_false() {
        let cur_level = next_level;
        let _guard = (RefsGuard::push(visited), RefsGuard::push(cur_level));

        let deadlock_candidate = if tracking { Some(cur_level) } else { None };
        let len = partitions.len();
        let (succ, remaining) = expand(&mode, cur_level, visited, partitions.clone(), 0, len, deadlock_candidate);
        next_level = succ;

        if let Some(remaining) = remaining {
            if !remaining.is_false() {
                found_deadlocks = Some(remaining);
                tracking = false;
                log::info!("reachability: found deadlock states at level {}", levels + 1);
            }
        }

        visited = or(visited, next_level);
        levels += 1;
        log::debug!("reachability: level {} done", levels);
    }

    Reached { visited, deadlocks: found_deadlocks, levels }
}

/// Divide-and-conquer union of `relnext(cur, R[i], vars[i])` over `partitions[from..from+len]`,
/// threading an optional running deadlock set through the same recursion (§4.7's `go_bfs`/
/// `go_par`): a state leaves `deadlocks` as soon as any partition gives it a successor.
fn expand(mode: &Mode, cur: Edge, visited: Edge, partitions: Arc<[Partition]>, from: usize, len: usize, deadlocks: Option<Edge>) -> (Edge, Option<Edge>) {
    if len == 1 {
        let p = &partitions[from];
        let succ = relnext(cur, p.relation, p.vars);
        let _guard = RefsGuard::push(succ);

        let deadlocks = deadlocks.map(|d| {
            let anc = relprev(p.relation, succ, p.vars);
            diff(d, anc)
        });

        let result = diff(succ, visited);
        return (result, deadlocks);
    }

    let left_len = (len + 1) / 2;
    let right_len = len / 2;

    let (left, right) = match mode {
        Mode::Par => {
            let left_handle = {
                let partitions = partitions.clone();
                manager().spawn(move || expand(&Mode::Par, cur, visited, partitions, from, left_len, deadlocks))
            };
            let right = manager().call(|| expand(mode, cur, visited, partitions.clone(), from + left_len, right_len, deadlocks));
            let left = manager().sync(left_handle);
            (left, right)
        }
        Mode::Bfs => {
            let left = expand(mode, cur, visited, partitions.clone(), from, left_len, deadlocks);
            let right = expand(mode, cur, visited, partitions.clone(), from + left_len, right_len, deadlocks);
            (left, right)
        }
    };

    let (left_result, left_deadlocks) = left;
    let (right_result, right_deadlocks) = right;

    let _guard = (RefsGuard::push(left_result), RefsGuard::push(right_result));
    let result = or(left_result, right_result);

    let deadlocks = match (left_deadlocks, right_deadlocks) {
        (Some(l), Some(r)) => Some(and(l, r)),
        _ => None,
    };

    (result, deadlocks)
}
