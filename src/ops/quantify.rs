//! `exists`/`forall` (§4.6): quantification over a cube of variables, encoded as a
//! right-spined conjunction BDD (`cube::cube`'s return shape — each node's low child is
//! always `false`; only the high spine matters).

use super::{and, child_cache_now, high_of, low_of, not, or, var_of};
use crate::cache::Opcode;
use crate::edge::Edge;
use crate::manager::manager;
use crate::refs::RefsGuard;
use crate::variable::Variable;

/// Advance `vars` past every variable strictly above `v` in the order — those don't
/// appear at or below this point of `a`, so quantifying over them here is a no-op.
fn skip_above(mut vars: Edge, v: Variable) -> Edge {
    while !vars.is_true() && var_of(vars) < v {
        vars = high_of(vars);
    }
    vars
}

pub fn exists(a: Edge, vars: Edge) -> Edge {
    quantify_rec(a, vars, Opcode::Exists, or, true)
}

pub fn forall(a: Edge, vars: Edge) -> Edge {
    quantify_rec(a, vars, Opcode::Forall, and, true)
}

fn quantify_rec(a: Edge, vars: Edge, opcode: Opcode, combine: fn(Edge, Edge) -> Edge, cache_now: bool) -> Edge {
    if a.is_true() || a.is_false() {
        return a;
    }
    if vars.is_true() {
        return a;
    }

    let a_var = var_of(a);
    let vars = skip_above(vars, a_var);
    if vars.is_true() {
        return a;
    }

    // The cache key conventionally uses the operand order (opcode, a, vars); both
    // `false` operand slots of the three-operand cache line go unused here.
    if cache_now {
        if let Some(cached) = manager().cache.get(opcode, a, vars, Edge::FALSE) {
            return cached;
        }
    }

    let _guard = (RefsGuard::push(a), RefsGuard::push(vars));

    let f0 = low_of(a);
    let f1 = high_of(a);
    let vars_var = var_of(vars);

    let result = if vars_var == a_var {
        let rest = high_of(vars);
        let cn = child_cache_now(a_var, &[f0, f1]);
        let low_handle = manager().spawn(move || quantify_rec(f0, rest, opcode, combine, cn));
        let high = manager().call(|| quantify_rec(f1, rest, opcode, combine, cn));
        let low = manager().sync(low_handle);
        combine(low, high)
    } else {
        let cn = child_cache_now(a_var, &[f0, f1]);
        let low_handle = manager().spawn(move || quantify_rec(f0, vars, opcode, combine, cn));
        let high = manager().call(|| quantify_rec(f1, vars, opcode, combine, cn));
        let low = manager().sync(low_handle);
        manager().makenode(a_var, low, high)
    };

    if cache_now {
        manager().cache.put(opcode, a, vars, Edge::FALSE, result);
    }

    result
}

/// `forall(a, V) == not(exists(not(a), V))` — provided here as a direct check used by
/// tests; the real `forall` above is its own direct recursion rather than routing through
/// `not`/`exists` twice, to avoid doubling the work on the hot path.
#[allow(dead_code)]
pub(crate) fn forall_via_exists(a: Edge, vars: Edge) -> Edge {
    not(exists(not(a), vars))
}
