use criterion::{criterion_group, criterion_main, Criterion, SamplingMode};
use criterion_perf_events::Perf;
use perfcnt::linux::{HardwareEventType, PerfCounterBuilderLinux};
use sylvan_rs::config::Config;
use sylvan_rs::variable::Variable;
use sylvan_rs::{and, ithvar, manager, nodecount, or};

/// A "staircase" BDD over `n` variables: `v0&v1 | v1&v2 | v2&v3 | ...`, built
/// left-to-right so each `or` genuinely grows the node count instead of collapsing back
/// to a single clause.
fn staircase(n: u32) -> sylvan_rs::Edge {
    let mut acc = sylvan_rs::Edge::FALSE;
    for i in 0..n.saturating_sub(1) {
        let a = ithvar(Variable::from(2 * i));
        let b = ithvar(Variable::from(2 * i + 1));
        acc = or(acc, and(a, b));
    }
    acc
}

pub fn criterion_benchmark(c: &mut Criterion<Perf>) {
    manager::init(Config::builder().table_capacity_log2(22).cache_capacity_log2(18).worker_count(0).build().unwrap())
        .expect("bench manager init");

    let mut group = c.benchmark_group("itgr");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);

    for &size in &[64u32, 256, 1024] {
        let left = staircase(size);
        let right = staircase(size + 1);
        println!("size={} node count of (left or right): {}", size, nodecount(or(left, right)));

        let benchmark = format!("or_{}", size);
        group.bench_function(benchmark, |b| {
            b.iter(|| or(left, right));
        });
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().with_measurement(Perf::new(PerfCounterBuilderLinux::from_hardware_event(HardwareEventType::CPUCycles)));
    targets = criterion_benchmark
);
criterion_main!(benches);
