//! Cube construction, single satisfying path, and path enumeration (§4.6).
//!
//! A cube is a conjunction of literals, represented as the right-spined BDD the glossary
//! describes: every node's low child is `false`, so the only interesting structure is the
//! chain of high edges down the variable order.

use super::{high_of, low_of, var_of};
use crate::edge::Edge;
use crate::manager::manager;
use crate::variable::Variable;

/// A single literal's polarity inside a `cube`/`sat_one` call.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Literal {
    Negative,
    Positive,
    /// "Don't care" — `cube` skips the variable entirely, `sat_one` picks either branch.
    DontCare,
}

/// Build the right-spined cube over `vars` fixing each variable to its paired `bits[i]`
/// polarity (`DontCare` entries are omitted from the resulting cube).
pub fn cube(vars: &[Variable], bits: &[Literal]) -> Edge {
    debug_assert_eq!(vars.len(), bits.len());
    let mut result = Edge::TRUE;
    for (&v, &lit) in vars.iter().zip(bits.iter()).rev() {
        result = match lit {
            Literal::Positive => manager().makenode(v, Edge::FALSE, result),
            Literal::Negative => manager().makenode(v, result, Edge::FALSE).complement(),
            Literal::DontCare => result,
        };
    }
    result
}

/// Walk `a` along one satisfying path restricted to `vars`, writing each variable's chosen
/// polarity into `out` (same order as `vars`). Prefers the `high` branch when both
/// cofactors are satisfiable, matching the source's default bias.
pub fn sat_one(a: Edge, vars: &[Variable], out: &mut [Literal]) {
    debug_assert_eq!(vars.len(), out.len());
    let mut current = a;
    for (v, slot) in vars.iter().zip(out.iter_mut()) {
        if current.is_false() {
            *slot = Literal::DontCare;
            continue;
        }
        if var_of(current) != *v {
            *slot = Literal::DontCare;
            continue;
        }
        let high = high_of(current);
        if !high.is_false() {
            *slot = Literal::Positive;
            current = high;
        } else {
            *slot = Literal::Negative;
            current = low_of(current);
        }
    }
}

/// Pick an arbitrary full cube satisfying `a`, returned as an edge (`sat_one` followed by
/// `cube`'s construction in one pass over `a`'s own structure rather than an explicit
/// variable list — used when the caller only needs *a* witness, not a specific order).
pub fn pick_cube(a: Edge) -> Edge {
    if a.is_false() {
        return Edge::FALSE;
    }
    if a.is_true() {
        return Edge::TRUE;
    }
    let v = var_of(a);
    let high = high_of(a);
    if !high.is_false() {
        manager().makenode(v, Edge::FALSE, pick_cube(high))
    } else {
        manager().makenode(v, pick_cube(low_of(a)), Edge::FALSE).complement()
    }
}

/// Enumerate the lexicographically-first full path through `a` restricted to `vars`,
/// mirroring `sat_one` but returning `None` when `a` is unsatisfiable.
pub fn enum_first(a: Edge, vars: &[Variable]) -> Option<Vec<Literal>> {
    if a.is_false() {
        return None;
    }
    let mut out = vec![Literal::DontCare; vars.len()];
    sat_one(a, vars, &mut out);
    Some(out)
}

/// Advance `current` (as produced by `enum_first`/a previous `enum_next`) to the next
/// path of `a` in the same fixed `vars` order, or `None` once every path has been visited.
/// Paths are enumerated by treating `current` as a binary counter over the `DontCare`
/// positions and incrementing the lowest-order one that still has an alternative.
pub fn enum_next(a: Edge, vars: &[Variable], current: &[Literal]) -> Option<Vec<Literal>> {
    let mut next = current.to_vec();
    for i in (0..vars.len()).rev() {
        match next[i] {
            Literal::Positive => {
                next[i] = Literal::Negative;
                if path_exists(a, vars, &next) {
                    return Some(next);
                }
            }
            Literal::Negative | Literal::DontCare => {}
        }
    }
    None
}

fn path_exists(a: Edge, vars: &[Variable], bits: &[Literal]) -> bool {
    let mut current = a;
    for (v, lit) in vars.iter().zip(bits.iter()) {
        if current.is_false() {
            return false;
        }
        if var_of(current) != *v {
            continue;
        }
        current = match lit {
            Literal::Positive => high_of(current),
            Literal::Negative => low_of(current),
            Literal::DontCare => return true,
        };
    }
    !current.is_false()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn with_fresh_manager(f: impl FnOnce()) {
        let _ = crate::manager::init(Config::builder().table_capacity_log2(14).cache_capacity_log2(10).worker_count(1).build().unwrap());
        f();
    }

    #[test]
    fn cube_with_no_dont_cares_is_a_single_path() {
        with_fresh_manager(|| {
            let vars = [Variable::from(20), Variable::from(21), Variable::from(22)];
            let bits = [Literal::Positive, Literal::Negative, Literal::Positive];
            let c = cube(&vars, &bits);
            assert_eq!(crate::ops::satcount(c, &vars), 1.0);
        });
    }

    #[test]
    fn sat_one_round_trips_through_cube() {
        with_fresh_manager(|| {
            let vars = [Variable::from(30), Variable::from(31)];
            let bits = [Literal::Positive, Literal::Negative];
            let c = cube(&vars, &bits);
            let mut out = [Literal::DontCare; 2];
            sat_one(c, &vars, &mut out);
            assert_eq!(out, bits);
        });
    }
}
