//! Saturation / chaining (§4.7): applies each relation to local fixpoint at its own
//! variable level before descending further, rather than expanding level-by-level across
//! the whole state space. Requires partitions sorted by ascending top variable.

use super::Partition;
use crate::cache::Opcode;
use crate::edge::Edge;
use crate::manager::manager;
use crate::ops::{high_of, low_of, or, relnext, var_of};
use crate::refs::RefsGuard;
use std::sync::Arc;

/// Run saturation from `initial` over `partitions`. Partitions are sorted internally (a
/// gnome sort over the relations' top variables, mirroring the reference driver — sort
/// stability is irrelevant since all partition orderings within the same top variable are
/// externally equivalent, §4.7) before the fixpoint recursion begins.
pub fn sat(initial: Edge, partitions: &[Partition]) -> Edge {
    let mut sorted = partitions.to_vec();
    gnome_sort_by_top_var(&mut sorted);
    go_sat(initial, Arc::from(sorted), 0)
}

fn gnome_sort_by_top_var(partitions: &mut [Partition]) {
    let mut i = 1usize;
    while i < partitions.len() {
        if i == 0 || var_of(partitions[i - 1].relation) <= var_of(partitions[i].relation) {
            i += 1;
        } else {
            partitions.swap(i - 1, i);
            i -= 1;
        }
    }
}

fn go_sat(set: Edge, partitions: Arc<[Partition]>, idx: usize) -> Edge {
    if set.is_false() {
        return Edge::FALSE;
    }
    if idx == partitions.len() {
        return set;
    }

    let idx_key = Edge::from_index(idx as u64);
    if let Some(cached) = manager().cache.get(Opcode::Saturate, set, idx_key, Edge::FALSE) {
        return cached;
    }

    let _guard = RefsGuard::push(set);

    let v = var_of(partitions[idx].relation);
    let set_var = var_of(set);

    let result = if set.is_true() || v <= set_var {
        // A run of relations all rooted at `v`: chain them to a local fixpoint (deepest
        // relations first) before returning control to the caller's own level.
        let mut run_len = 1;
        while idx + run_len < partitions.len() && var_of(partitions[idx + run_len].relation) == v {
            run_len += 1;
        }

        let mut current = set;
        loop {
            let _guard = RefsGuard::push(current);
            let mut next = go_sat(current, partitions.clone(), idx + run_len);
            for j in 0..run_len {
                let _guard = RefsGuard::push(next);
                let p = &partitions[idx + j];
                let step = relnext(next, p.relation, p.vars);
                next = or(next, step);
            }
            if next == current {
                break;
            }
            current = next;
        }
        current
    } else {
        // `set`'s own top variable sits above every relation left to apply here: Shannon
        // expand on it and recurse into both cofactors at the same `idx`.
        let low_handle = {
            let low = low_of(set);
            let partitions = partitions.clone();
            manager().spawn(move || go_sat(low, partitions, idx))
        };
        let high = manager().call(|| go_sat(high_of(set), partitions.clone(), idx));
        let low = manager().sync(low_handle);
        manager().makenode(set_var, low, high)
    };

    manager().cache.put(Opcode::Saturate, set, idx_key, Edge::FALSE, result);
    result
}
