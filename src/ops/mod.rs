//! Core recursive DD operations (§4.6): `ite` and its derived binary connectives, `not`,
//! plus the shared Shannon-expansion/cache-probe scaffolding every other operation in
//! this module tree builds on.

mod analysis;
mod compose;
mod cube;
mod quantify;
mod relational;

pub use analysis::{nodecount, pathcount, satcount, support};
pub use compose::{build_map, compose, MapEntry};
pub use cube::{cube, enum_first, enum_next, pick_cube, sat_one, Literal};
pub use quantify::{exists, forall};
pub use relational::{relnext, relprev};

use crate::cache::Opcode;
use crate::edge::Edge;
use crate::manager::manager;
use crate::refs::RefsGuard;
use crate::variable::Variable;

#[inline]
pub(crate) fn var_of(edge: Edge) -> Variable {
    if edge.is_constant() {
        Variable::UNDEFINED
    } else {
        manager().table.get(edge.index()).get_variable()
    }
}

#[inline]
pub(crate) fn low_of(edge: Edge) -> Edge {
    let node = manager().table.get(edge.index());
    edge.transfer_mark(node.get_low())
}

#[inline]
pub(crate) fn high_of(edge: Edge) -> Edge {
    let node = manager().table.get(edge.index());
    edge.transfer_mark(node.get_high())
}

/// The smaller of two non-undefined variables is "higher" in the order (closer to the
/// root); `Variable::UNDEFINED` sorts last so a constant argument never wins `top_var`.
pub(crate) fn top_var(vars: &[Variable]) -> Option<Variable> {
    vars.iter().copied().filter(|v| !v.is_undefined()).min()
}

/// The cofactor of `edge` with respect to `v`: itself, unless `edge`'s own top variable
/// is `v`, in which case the low (`want_high = false`) or high (`true`) child.
pub(crate) fn cofactor(edge: Edge, v: Variable, want_high: bool) -> Edge {
    if var_of(edge) == v {
        if want_high {
            high_of(edge)
        } else {
            low_of(edge)
        }
    } else {
        edge
    }
}

/// Decide whether a child recursion should touch the cache, per the granularity rule of
/// §4.6: true at blocks boundaries, false when the parent and child variable fall in the
/// same `granularity`-sized block (so deep, narrow recursions skip most cache traffic).
pub(crate) fn child_cache_now(parent: Variable, children: &[Edge]) -> bool {
    let granularity = manager().granularity.max(1);
    match top_var(&children.iter().map(|&e| var_of(e)).collect::<Vec<_>>()) {
        Some(child_var) => parent.raw() / granularity != child_var.raw() / granularity,
        None => true,
    }
}

pub(crate) fn not(edge: Edge) -> Edge {
    edge.complement()
}

/// The primitive: `if f then g else h`. All other binary connectives are thin wrappers
/// around this (§4.6).
pub fn ite(f: Edge, g: Edge, h: Edge) -> Edge {
    ite_rec(f, g, h, true)
}

fn ite_rec(f: Edge, g: Edge, h: Edge, cache_now: bool) -> Edge {
    if f.is_true() {
        return g;
    }
    if f.is_false() {
        return h;
    }
    if g == h {
        return g;
    }
    if g.is_true() && h.is_false() {
        return f;
    }
    if g.is_false() && h.is_true() {
        return not(f);
    }

    // Standard-triples normalization: collapse argument combinations that are
    // semantically identical to a single canonical form before ever touching the cache
    // (§4.6 step 2).
    let mut g = g;
    let mut h = h;
    if g == f {
        g = Edge::TRUE;
    } else if g == not(f) {
        g = Edge::FALSE;
    }
    if h == f {
        h = Edge::TRUE;
    } else if h == not(f) {
        h = Edge::FALSE;
    }

    // Push the negation implied by "ite(f,g,h) == not(ite(f,not(g),not(h)))" onto the
    // result so a complemented `g` never reaches the cache or the table — halves the
    // number of distinct cache keys two logically-related queries would otherwise use.
    let negate = g.is_complemented();
    let (g, h) = if negate { (not(g), not(h)) } else { (g, h) };

    if cache_now {
        if let Some(cached) = manager().cache.get(Opcode::Ite, f, g, h) {
            return if negate { not(cached) } else { cached };
        }
    }

    let _guard = (RefsGuard::push(f), RefsGuard::push(g), RefsGuard::push(h));

    let v = top_var(&[var_of(f), var_of(g), var_of(h)]).expect("at least one argument is non-terminal here");

    let f0 = cofactor(f, v, false);
    let f1 = cofactor(f, v, true);
    let g0 = cofactor(g, v, false);
    let g1 = cofactor(g, v, true);
    let h0 = cofactor(h, v, false);
    let h1 = cofactor(h, v, true);

    let child_cache_now = child_cache_now(v, &[f0, g0, h0, f1, g1, h1]);

    let low_handle = manager().spawn(move || ite_rec(f0, g0, h0, child_cache_now));
    let high = manager().call(|| ite_rec(f1, g1, h1, child_cache_now));
    let low = manager().sync(low_handle);

    let _guard_low = RefsGuard::push(low);
    let result = manager().makenode(v, low, high);

    if cache_now {
        manager().cache.put(Opcode::Ite, f, g, h, result);
    }

    if negate {
        not(result)
    } else {
        result
    }
}

pub fn and(a: Edge, b: Edge) -> Edge {
    ite(a, b, Edge::FALSE)
}

pub fn or(a: Edge, b: Edge) -> Edge {
    ite(a, Edge::TRUE, b)
}

pub fn xor(a: Edge, b: Edge) -> Edge {
    ite(a, not(b), b)
}

pub fn imp(a: Edge, b: Edge) -> Edge {
    ite(a, b, Edge::TRUE)
}

pub fn biimp(a: Edge, b: Edge) -> Edge {
    ite(a, b, not(b))
}

/// `a ∧ ¬b`.
pub fn diff(a: Edge, b: Edge) -> Edge {
    ite(b, Edge::FALSE, a)
}

pub fn nand(a: Edge, b: Edge) -> Edge {
    not(and(a, b))
}

pub fn nor(a: Edge, b: Edge) -> Edge {
    not(or(a, b))
}

/// `a ∧ ¬b`, from `a`'s perspective read as "less than" when both are thought of as
/// characteristic predicates of a total order — kept distinct from `diff` only by
/// argument order, matching the source's naming.
pub fn less(a: Edge, b: Edge) -> Edge {
    ite(a, Edge::FALSE, b)
}

pub fn invimp(a: Edge, b: Edge) -> Edge {
    ite(a, Edge::TRUE, not(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn with_fresh_manager(f: impl FnOnce()) {
        // Each test module that exercises the singleton manager calls `init` once; since
        // `cargo test` runs unit tests in one process, only the first caller actually
        // initializes it and the rest observe the same table — which is fine, these laws
        // hold regardless of what else shares the table.
        let _ = crate::manager::init(Config::builder().table_capacity_log2(14).cache_capacity_log2(10).worker_count(1).build().unwrap());
        f();
    }

    #[test]
    fn double_negation_is_identity() {
        with_fresh_manager(|| {
            let v = crate::ithvar(crate::variable::Variable::from(0));
            assert_eq!(not(not(v)), v);
        });
    }

    #[test]
    fn ite_identities() {
        with_fresh_manager(|| {
            let a = crate::ithvar(crate::variable::Variable::from(1));
            let b = crate::ithvar(crate::variable::Variable::from(2));
            assert_eq!(and(a, Edge::TRUE), a);
            assert_eq!(or(a, Edge::FALSE), a);
            assert_eq!(ite(Edge::TRUE, a, b), a);
            assert_eq!(ite(Edge::FALSE, a, b), b);
        });
    }

    #[test]
    fn de_morgan_holds() {
        with_fresh_manager(|| {
            let a = crate::ithvar(crate::variable::Variable::from(3));
            let b = crate::ithvar(crate::variable::Variable::from(4));
            assert_eq!(not(and(a, b)), or(not(a), not(b)));
        });
    }

    #[test]
    fn ite_expansion_matches_primitive() {
        with_fresh_manager(|| {
            let a = crate::ithvar(crate::variable::Variable::from(5));
            let b = crate::ithvar(crate::variable::Variable::from(6));
            let c = crate::ithvar(crate::variable::Variable::from(7));
            assert_eq!(ite(a, b, c), or(and(a, b), and(not(a), c)));
        });
    }
}
