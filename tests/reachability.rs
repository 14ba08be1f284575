//! Reachability over a small synthetic transition system, checked for bit-equal results
//! across all three driving strategies.

use sylvan_rs::config::Config;
use sylvan_rs::reachability::{bfs, par, sat, Partition};
use sylvan_rs::variable::Variable;
use sylvan_rs::{and, biimp, cube, ithvar, nithvar, nodecount, not, satcount, Edge, Literal};

fn with_fresh_manager(f: impl FnOnce()) {
    let _ = sylvan_rs::manager::init(
        Config::builder().table_capacity_log2(18).cache_capacity_log2(14).worker_count(2).build().unwrap(),
    );
    f();
}

/// A 3-bit binary counter incrementing mod 8: `unprimed` variables 0, 2, 4 hold the
/// current value, `primed` variables 1, 3, 5 the next one. `next_i = current_i XOR
/// carry_i`, `carry_0 = true`, `carry_{i+1} = current_i AND carry_i` — the usual
/// ripple-carry increment circuit.
fn increment_relation() -> (Edge, Edge) {
    let unprimed: Vec<Variable> = (0..3).map(|i| Variable::from(2 * i)).collect();

    let mut carry = Edge::TRUE;
    let mut relation = Edge::TRUE;
    for &v in &unprimed {
        let current = ithvar(v);
        let next_bit = sylvan_rs::xor(current, carry);
        let primed = ithvar(v.prime());
        relation = and(relation, biimp(primed, next_bit));
        carry = and(current, carry);
    }

    let bits: Vec<Literal> = vec![Literal::Positive; unprimed.len()];
    let vars = cube(&unprimed, &bits);
    (relation, vars)
}

fn initial_state() -> Edge {
    let mut state = Edge::TRUE;
    for i in 0..3u32 {
        state = and(state, nithvar(Variable::from(2 * i)));
    }
    state
}

#[test]
fn all_three_strategies_reach_the_same_fixpoint() {
    with_fresh_manager(|| {
        let (relation, vars) = increment_relation();
        let partitions = [Partition { relation, vars }];
        let initial = initial_state();

        let bfs_result = bfs(initial, &partitions, false);
        let par_result = par(initial, &partitions, false);
        let sat_result = sat(initial, &partitions);

        assert_eq!(bfs_result.visited, par_result.visited);
        assert_eq!(bfs_result.visited, sat_result);

        // The increment map is a single 8-cycle, so starting from 0 every one of the 8
        // assignments over the 3 state bits is eventually reached.
        assert_eq!(bfs_result.visited, Edge::TRUE);
        assert_eq!(bfs_result.levels, 8);

        let state_vars: Vec<Variable> = (0..3).map(|i| Variable::from(2 * i)).collect();
        assert_eq!(satcount(bfs_result.visited, &state_vars), 8.0);
    });
}

#[test]
fn a_sink_state_is_reported_as_a_deadlock() {
    with_fresh_manager(|| {
        // A relation that only ever fires out of state 0 (x0=x1=x2=false): every other
        // state has no successor and is therefore a deadlock.
        let x0 = ithvar(Variable::from(0));
        let x1 = ithvar(Variable::from(2));
        let x2 = ithvar(Variable::from(4));
        let at_zero = and(and(not(x0), not(x1)), not(x2));

        let next_is_one = and(
            and(ithvar(Variable::from(1)), not(ithvar(Variable::from(3)))),
            not(ithvar(Variable::from(5))),
        );
        let relation = and(at_zero, next_is_one);

        let unprimed: Vec<Variable> = (0..3).map(|i| Variable::from(2 * i)).collect();
        let bits = vec![Literal::Positive; unprimed.len()];
        let vars = cube(&unprimed, &bits);

        let partitions = [Partition { relation, vars }];
        let initial = at_zero;

        let reached = bfs(initial, &partitions, true);
        // Level 1 reaches state 1 (x0=true, x1=x2=false); state 1 has no outgoing edge
        // under this relation, so it is immediately found to be a deadlock.
        assert!(reached.deadlocks.is_some());
        let deadlocks = reached.deadlocks.unwrap();
        assert!(!deadlocks.is_false());
        assert!(nodecount(deadlocks) > 0);
    });
}
