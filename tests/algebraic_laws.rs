//! Boolean algebra laws checked against randomly generated formulas, run once per test
//! binary against a single shared manager instance.

use proptest::prelude::*;
use sylvan_rs::config::Config;
use sylvan_rs::variable::Variable;
use sylvan_rs::{and, biimp, ite, ithvar, not, or, xor, Edge};

const VAR_COUNT: u32 = 6;

fn with_fresh_manager(f: impl FnOnce()) {
    // Sized generously relative to the small formulas this file generates: every
    // `proptest!` block in this binary shares one process-wide manager, and a real GC
    // cycle triggered mid-run would race against whichever other of these tests' OS
    // threads happen to be executing concurrently (the stop-the-world barrier only
    // coordinates the runtime's own worker threads, not cargo's test harness threads).
    let _ = sylvan_rs::manager::init(
        Config::builder().table_capacity_log2(20).cache_capacity_log2(14).worker_count(2).build().unwrap(),
    );
    f();
}

fn var_index() -> impl Strategy<Value = u32> {
    0..VAR_COUNT
}

/// A small recursive formula grammar: literals, and/or/xor/not, built over `VAR_COUNT`
/// variables. Recursion depth is capped by `proptest`'s default `ProptestConfig` via
/// `leaf(...).prop_recursive(...)`.
fn formula() -> impl Strategy<Value = Edge> {
    let leaf = var_index().prop_map(|v| ithvar(Variable::from(v)));
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(not),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| and(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| or(a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| xor(a, b)),
        ]
    })
}

proptest! {
    #[test]
    fn double_negation_is_identity(f in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(not(not(f)), f);
        });
    }

    #[test]
    fn and_is_commutative(a in formula(), b in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(and(a, b), and(b, a));
        });
    }

    #[test]
    fn or_is_commutative(a in formula(), b in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(or(a, b), or(b, a));
        });
    }

    #[test]
    fn de_morgan_over_and(a in formula(), b in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(not(and(a, b)), or(not(a), not(b)));
        });
    }

    #[test]
    fn de_morgan_over_or(a in formula(), b in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(not(or(a, b)), and(not(a), not(b)));
        });
    }

    #[test]
    fn ite_matches_its_expansion(f in formula(), g in formula(), h in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(ite(f, g, h), or(and(f, g), and(not(f), h)));
        });
    }

    #[test]
    fn xor_is_its_own_biimp_negation(a in formula(), b in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(xor(a, b), not(biimp(a, b)));
        });
    }

    #[test]
    fn and_is_idempotent(f in formula()) {
        with_fresh_manager(|| {
            prop_assert_eq!(and(f, f), f);
        });
    }

    #[test]
    fn hash_consing_returns_the_same_edge_for_the_same_formula(a in formula(), b in formula()) {
        with_fresh_manager(|| {
            let lhs = and(a, b);
            let rhs = and(a, b);
            prop_assert_eq!(lhs, rhs);
        });
    }
}
