//! A multi-core reduced ordered binary decision diagram (ROBDD) engine for symbolic model
//! checking, modeled on Sylvan's design: a shared hash-consed node table, a lossy
//! operation cache, stop-the-world mark-and-sweep GC, and a work-stealing fork-join task
//! runtime underneath the usual BDD operation set.
//!
//! This crate exposes its public API as free functions at the crate root (`ithvar`,
//! `ite`, `and`, `exists`, ...) plus a handful of modules for the pieces that are
//! naturally their own namespace: [`config`] (the `init` parameters), [`error`], the
//! [`manager`] lifecycle (`init`/`quit`), [`reachability`] (the `bfs`/`par`/`sat`
//! drivers), and [`serialize`] (the wire format). Everything operates on the global
//! singleton set up by `manager::init` — there is no per-call manager handle, matching
//! every function signature below taking no such argument.

pub mod cache;
pub mod cli;
pub mod config;
pub mod edge;
pub mod error;
pub mod manager;
pub mod node;
pub mod ops;
pub mod reachability;
pub mod refs;
mod runtime;
pub mod serialize;
pub mod table;
pub mod variable;

pub use edge::Edge;
pub use variable::Variable;

use manager::manager;

/// `ithvar(v)`: the BDD that is `true` exactly when `v` is `true` (§6).
pub fn ithvar(v: Variable) -> Edge {
    manager().makenode(v, Edge::FALSE, Edge::TRUE)
}

/// `nithvar(v)`: the BDD that is `true` exactly when `v` is `false`.
pub fn nithvar(v: Variable) -> Edge {
    not(ithvar(v))
}

/// Construct `(var, low, high)` directly, applying the same normalization `ithvar` and
/// every recursive operation rely on (§4.5).
pub fn makenode(var: Variable, low: Edge, high: Edge) -> Edge {
    manager().makenode(var, low, high)
}

/// The variable `a`'s root node branches on; undefined for a terminal edge.
pub fn var(a: Edge) -> Variable {
    ops::var_of(a)
}

pub fn low(a: Edge) -> Edge {
    ops::low_of(a)
}

pub fn high(a: Edge) -> Edge {
    ops::high_of(a)
}

/// Logical negation: flips the complement bit, no table or cache access (§4.5).
pub fn not(a: Edge) -> Edge {
    a.complement()
}

pub use ops::{
    and, biimp, build_map, compose, cube, diff, enum_first, enum_next, exists, forall, imp, invimp, ite, less, nand,
    nodecount, nor, or, pathcount, pick_cube, relnext, relprev, sat_one, satcount, support, xor, Literal, MapEntry,
};

pub use serialize::{load_bdd, save_bdd};

/// Increment `a`'s external reference count, registering it as a GC root until a matching
/// [`dereference`] (§4.3).
pub fn reference(a: Edge) {
    manager().refs.reference(a);
}

pub fn dereference(a: Edge) {
    manager().refs.dereference(a);
}

/// Register `slot` as a GC root read in place on every collection, until a matching
/// [`unprotect`]. *Safety*: `slot` must stay valid for that whole interval (§4.3).
pub unsafe fn protect(slot: *const Edge) {
    manager().protected.protect(slot);
}

pub fn unprotect(slot: *const Edge) {
    manager().protected.unprotect(slot);
}

/// Force a stop-the-world mark-and-sweep cycle now, rather than waiting for the next
/// insert that crosses the fill threshold (§4.2).
pub fn gc() {
    manager().collect();
}

pub fn gc_disable() {
    manager().gc_disable();
}

pub fn gc_enable() {
    manager().gc_enable();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn with_fresh_manager(f: impl FnOnce()) {
        let _ = manager::init(Config::builder().table_capacity_log2(14).cache_capacity_log2(10).worker_count(1).build().unwrap());
        f();
    }

    #[test]
    fn ithvar_and_nithvar_are_complements() {
        with_fresh_manager(|| {
            let v = Variable::from(200);
            assert_eq!(nithvar(v), not(ithvar(v)));
            assert_eq!(var(ithvar(v)), v);
            assert_eq!(low(ithvar(v)), Edge::FALSE);
            assert_eq!(high(ithvar(v)), Edge::TRUE);
        });
    }

    #[test]
    fn reference_and_dereference_do_not_panic_on_the_live_manager() {
        // A full `gc()` cycle is exercised in `tests/gc.rs` under a single-threaded
        // harness instead of here: this binary's unit tests share one process-wide
        // manager and may run concurrently on cargo's own test threads, which are not
        // runtime workers and would not pause for a stop-the-world collection.
        with_fresh_manager(|| {
            let v = ithvar(Variable::from(201));
            reference(v);
            dereference(v);
        });
    }
}
