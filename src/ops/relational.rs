//! `relnext`/`relprev` (§4.6): the fused relational-product operators used by the
//! reachability drivers, over the paired even/odd (X/X′) variable convention.
//!
//! State predicates are always expressed over the unprimed (even) variables; a relation
//! connects an unprimed "current" half to a primed "next" half. `relnext` fuses the
//! existential quantification over `vars` with the implicit X′→X rename so reachability
//! never has to materialize an intermediate X′-indexed set. `relprev` is expressed
//! compositionally (rename, conjoin, quantify) rather than fused — it runs once per
//! partition per deadlock check rather than once per BFS/SAT level, so the extra
//! intermediate nodes it allocates are not on the hot path the way `relnext`'s are.

use super::{and, child_cache_now, cofactor, exists, high_of, low_of, or, top_var, var_of};
use crate::cache::Opcode;
use crate::edge::Edge;
use crate::manager::manager;
use crate::refs::RefsGuard;
use crate::variable::Variable;

/// Advance `vars`'s spine past every variable strictly below `v`, then report whether `v`
/// itself is present (and, if so, the cube with `v` consumed).
fn advance_vars(vars: Edge, v: Variable) -> (bool, Edge) {
    let mut cursor = vars;
    while !cursor.is_true() && var_of(cursor) < v {
        cursor = high_of(cursor);
    }
    if !cursor.is_true() && var_of(cursor) == v {
        (true, high_of(cursor))
    } else {
        (false, cursor)
    }
}

pub fn relnext(states: Edge, rel: Edge, vars: Edge) -> Edge {
    relnext_rec(states, rel, vars, true)
}

fn relnext_rec(states: Edge, rel: Edge, vars: Edge, cache_now: bool) -> Edge {
    if states.is_false() || rel.is_false() {
        return Edge::FALSE;
    }
    if states.is_true() && rel.is_true() {
        return Edge::TRUE;
    }

    if cache_now {
        if let Some(cached) = manager().cache.get(Opcode::RelNext, states, rel, vars) {
            return cached;
        }
    }

    let _guard = (RefsGuard::push(states), RefsGuard::push(rel), RefsGuard::push(vars));

    let v = top_var(&[var_of(states), var_of(rel)]).expect("at least one argument is non-terminal here");
    let s0 = cofactor(states, v, false);
    let s1 = cofactor(states, v, true);
    let r0 = cofactor(rel, v, false);
    let r1 = cofactor(rel, v, true);

    let (present, rest) = advance_vars(vars, v);
    let cn = child_cache_now(v, &[s0, r0, s1, r1]);

    let result = if present {
        let low_handle = manager().spawn(move || relnext_rec(s0, r0, rest, cn));
        let high = manager().call(|| relnext_rec(s1, r1, rest, cn));
        let low = manager().sync(low_handle);
        or(low, high)
    } else {
        let target = if v.is_primed() { v.unprime() } else { v };
        let low_handle = manager().spawn(move || relnext_rec(s0, r0, rest, cn));
        let high = manager().call(|| relnext_rec(s1, r1, rest, cn));
        let low = manager().sync(low_handle);
        manager().makenode(target, low, high)
    };

    if cache_now {
        manager().cache.put(Opcode::RelNext, states, rel, vars, result);
    }

    result
}

pub fn relprev(rel: Edge, next: Edge, vars: Edge) -> Edge {
    let primed_next = rename_to_primed(next);
    let conjunction = and(rel, primed_next);
    exists(conjunction, prime_cube(vars))
}

fn rename_to_primed(edge: Edge) -> Edge {
    if edge.is_constant() {
        return edge;
    }
    if let Some(cached) = manager().cache.get(Opcode::Rename, edge, Edge::FALSE, Edge::FALSE) {
        return cached;
    }

    let _guard = RefsGuard::push(edge);
    let v = var_of(edge);
    let f0 = low_of(edge);
    let f1 = high_of(edge);

    let low_handle = manager().spawn(move || rename_to_primed(f0));
    let high = manager().call(|| rename_to_primed(f1));
    let low = manager().sync(low_handle);

    let result = manager().makenode(v.prime(), low, high);
    manager().cache.put(Opcode::Rename, edge, Edge::FALSE, Edge::FALSE, result);
    result
}

fn prime_cube(vars: Edge) -> Edge {
    if vars.is_true() {
        return Edge::TRUE;
    }
    let v = var_of(vars);
    let rest = prime_cube(high_of(vars));
    manager().makenode(v.prime(), Edge::FALSE, rest)
}
