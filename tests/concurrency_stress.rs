//! Concurrency stress test (§8): many workers hammering `ite` on a shared pool of edges
//! concurrently. Every call's `(f, g, h) -> result` is recorded; afterwards, the test
//! recomputes `ite` for each recorded triple serially and checks it against the result
//! observed under contention. Hash-consing (I1) guarantees a single `(var, low, high)`
//! triple maps to exactly one table slot, so if two racing inserts had ever produced two
//! different slots for what should have been the same node, the concurrently-observed
//! result and the later serial recomputation would disagree for at least one triple.

use sylvan_rs::config::Config;
use sylvan_rs::variable::Variable;
use sylvan_rs::{ite, ithvar, manager, not, or, Edge};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

const POOL_SIZE: usize = 64;
const ITERATIONS_PER_THREAD: usize = 20_000;
const THREAD_COUNT: usize = 4;

/// A deterministic xorshift generator so the test stays reproducible without pulling in
/// a `rand` dependency the rest of the crate has no other use for.
struct Xorshift(u64);

impl Xorshift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn index(&mut self, bound: usize) -> usize {
        (self.next() as usize) % bound
    }
}

#[test]
fn concurrent_ite_never_duplicates_a_node() {
    let _ = manager::init(Config::builder().table_capacity_log2(20).cache_capacity_log2(16).worker_count(4).build().unwrap());

    // Seed a shared pool of edges: variables, their negations, and a handful of small
    // combinations, all built before the concurrent phase so the stress run only ever
    // touches `ite`, never ordinary single-threaded construction.
    let mut pool = Vec::with_capacity(POOL_SIZE);
    for i in 0..16u32 {
        let v = ithvar(Variable::from(i));
        pool.push(v);
        pool.push(not(v));
    }
    while pool.len() < POOL_SIZE {
        let a = pool[pool.len() % 16];
        let b = pool[(pool.len() * 3) % 16];
        pool.push(or(a, b));
    }
    let pool: Arc<[sylvan_rs::Edge]> = pool.into();

    let observed: Arc<Mutex<HashMap<(Edge, Edge, Edge), Edge>>> = Arc::new(Mutex::new(HashMap::new()));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|t| {
            let pool = pool.clone();
            let observed = observed.clone();
            thread::spawn(move || {
                let mut rng = Xorshift(0x9e3779b97f4a7c15 ^ (t as u64 + 1));
                let mut local = HashMap::new();
                for _ in 0..ITERATIONS_PER_THREAD {
                    let f = pool[rng.index(pool.len())];
                    let g = pool[rng.index(pool.len())];
                    let h = pool[rng.index(pool.len())];
                    let result = ite(f, g, h);
                    local.insert((f, g, h), result);
                }
                observed.lock().extend(local);
            })
        })
        .collect();

    for h in handles {
        h.join().expect("worker thread panicked");
    }

    let observed = observed.lock();
    let mut mismatches = 0u64;
    for (&(f, g, h), &result) in observed.iter() {
        if ite(f, g, h) != result {
            mismatches += 1;
        }
    }
    assert_eq!(mismatches, 0, "ite returned a different edge for the same (f, g, h) triple once recomputed serially");
}
