//! `compose` (§4.6): simultaneous substitution of a set of variables by arbitrary
//! functions, encoded as a `map` — itself a spine DD (`var -> replacement` pairs chained
//! through the high edge, mirroring `cube`'s right-spined shape but carrying an arbitrary
//! edge instead of `true` at each step).

use super::{high_of, ite, low_of, var_of};
use crate::cache::Opcode;
use crate::edge::Edge;
use crate::manager::manager;
use crate::refs::RefsGuard;
use crate::variable::Variable;

/// One `(variable, replacement)` pair of a composition map.
#[derive(Copy, Clone)]
pub struct MapEntry {
    pub variable: Variable,
    pub replacement: Edge,
}

/// Build the spine-encoded map `crate::ops::compose` consumes from an explicit list of
/// entries, which must already be sorted by variable (the same order `cube`'s spine
/// requires).
pub fn build_map(entries: &[MapEntry]) -> Edge {
    let mut result = Edge::TRUE;
    for entry in entries.iter().rev() {
        result = manager().makenode(entry.variable, result, entry.replacement);
    }
    result
}

/// For every node variable `v` with an entry `(v, g)` in `map`, replace it by
/// `ite(g, high, low)` (§4.6): the standard BDD composition identity, applied bottom-up so
/// the substitution commutes correctly through shared structure.
pub fn compose(a: Edge, map: Edge) -> Edge {
    if map.is_true() {
        return a;
    }
    compose_rec(a, map)
}

fn compose_rec(a: Edge, map: Edge) -> Edge {
    if a.is_constant() {
        return a;
    }
    if let Some(cached) = manager().cache.get(Opcode::Compose, a, map, Edge::FALSE) {
        return cached;
    }

    let _guard = (RefsGuard::push(a), RefsGuard::push(map));

    let v = var_of(a);
    let map_entry = find_entry(map, v);

    let low_handle = {
        let low = low_of(a);
        manager().spawn(move || compose_rec(low, map))
    };
    let high = manager().call(|| compose_rec(high_of(a), map));
    let low = manager().sync(low_handle);

    let result = match map_entry {
        Some(replacement) => ite(replacement, high, low),
        None => manager().makenode(v, low, high),
    };

    manager().cache.put(Opcode::Compose, a, map, Edge::FALSE, result);
    result
}

/// Walk the map's spine for an entry keyed by `v`; the spine is sorted, so this can stop
/// as soon as it passes `v`.
fn find_entry(map: Edge, v: Variable) -> Option<Edge> {
    let mut cursor = map;
    while !cursor.is_true() {
        let cursor_var = var_of(cursor);
        if cursor_var == v {
            return Some(high_of(cursor));
        }
        if cursor_var > v {
            return None;
        }
        cursor = low_of(cursor);
    }
    None
}
