//! Single-DAG analyses: `support`, `satcount`, `pathcount`, `nodecount` (§4.6).

use super::{high_of, low_of, or, var_of};
use crate::cache::Opcode;
use crate::edge::Edge;
use crate::manager::manager;
use crate::refs::RefsGuard;
use crate::variable::Variable;

/// The cube of every variable appearing in `a`, in variable order — built bottom-up so
/// each recursive step either skips a variable `a` never branches on or inserts it at the
/// head of the spine.
pub fn support(a: Edge) -> Edge {
    if a.is_constant() {
        return Edge::TRUE;
    }
    let v = var_of(a);
    let low_support = support(low_of(a));
    let high_support = support(high_of(a));
    let rest = or(low_support, high_support);
    // `rest` is itself a cube over variables strictly below `v` (by I2), so prepending `v`
    // keeps the right-spined shape the glossary's `cube` representation requires.
    manager().makenode(v, Edge::FALSE, rest)
}

/// Number of satisfying assignments of `a` over exactly the variables in `vars` (a cube).
/// `satcount(false, _) = 0`; `satcount(true, vars) = 2^|vars|`; recursing past a variable
/// `a` doesn't branch on doubles the count, since both polarities of that variable satisfy
/// equally (§4.6, §8).
pub fn satcount(a: Edge, vars: &[Variable]) -> f64 {
    satcount_rec(a, vars)
}

fn satcount_rec(a: Edge, vars: &[Variable]) -> f64 {
    if a.is_false() {
        return 0.0;
    }
    if vars.is_empty() {
        // `a` must be `true` here: every variable `a` could branch on has been consumed,
        // and I2 guarantees a non-terminal node can't appear past the last variable.
        debug_assert!(a.is_true());
        return 1.0;
    }
    if a.is_true() {
        return 2f64.powi(vars.len() as i32);
    }

    // `satcount` is keyed on `(a, |vars|)` per §4.6; the cache line's third operand slot
    // goes unused. Results are floats, so they ride through the cache as their raw bit
    // pattern rather than a truncating integer count.
    let cache_key_count = Edge::from_index(vars.len() as u64);
    if let Some(cached) = manager().cache.get(Opcode::SatCount, a, cache_key_count, Edge::FALSE) {
        return f64::from_bits(cached.raw());
    }

    let v = vars[0];
    let a_var = var_of(a);
    let result = if a_var == v {
        let lo = satcount_rec(low_of(a), &vars[1..]);
        let hi = satcount_rec(high_of(a), &vars[1..]);
        lo + hi
    } else {
        // `a` doesn't branch on `v`; both assignments to `v` are equally satisfying.
        2.0 * satcount_rec(a, &vars[1..])
    };

    manager().cache.put(Opcode::SatCount, a, cache_key_count, Edge::FALSE, Edge::from_raw(result.to_bits()));
    result
}

/// Number of distinct satisfying paths (assignments to exactly the variables `a` actually
/// branches on, ignoring `vars`) — same recursion as `satcount` but without a fixed cube,
/// so don't-care variables along a path are not expanded.
pub fn pathcount(a: Edge) -> f64 {
    if a.is_false() {
        return 0.0;
    }
    if a.is_true() {
        return 1.0;
    }
    if let Some(cached) = manager().cache.get(Opcode::PathCount, a, Edge::FALSE, Edge::FALSE) {
        return f64::from_bits(cached.raw());
    }
    let result = pathcount(low_of(a)) + pathcount(high_of(a));
    manager().cache.put(Opcode::PathCount, a, Edge::FALSE, Edge::FALSE, Edge::from_raw(result.to_bits()));
    result
}

/// Count the distinct nodes reachable from `a` (terminals included once each they occur).
/// Single-threaded by contract (§4.6): it mutates each node's auxiliary flag bit to avoid
/// double-counting shared subgraphs, so callers must serialize concurrent callers and must
/// not run this concurrently with anything else that touches the aux bit (serialization).
pub fn nodecount(a: Edge) -> u64 {
    let mut count = 0u64;
    mark_and_count(a, &mut count);
    unmark(a);
    count
}

fn mark_and_count(edge: Edge, count: &mut u64) {
    if edge.is_constant() {
        return;
    }
    let _guard = RefsGuard::push(edge);
    if !manager().table.try_set_aux(edge.index()) {
        return;
    }
    *count += 1;
    let node = manager().table.get(edge.index());
    mark_and_count(node.get_low(), count);
    mark_and_count(node.get_high(), count);
}

fn unmark(edge: Edge) {
    if edge.is_constant() {
        return;
    }
    let node = manager().table.get(edge.index());
    if !node.aux_flag() {
        return;
    }
    manager().table.clear_aux(edge.index());
    unmark(node.get_low());
    unmark(node.get_high());
}
