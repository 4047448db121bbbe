//! Benchmarks for full rendezvous runs.
//!
//! Run with: cargo bench --bench formation
//!
//! This measures end-to-end simulation cost with all modeled delays zeroed,
//! so the numbers reflect protocol overhead (locking, channel hand-offs,
//! thread churn) rather than sleeps.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pitch_rendezvous::{NullObserver, SimulationBuilder};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn run_once(goalie_quota: u32, player_quota: u32) {
    let report = SimulationBuilder::new()
        .with_quotas(goalie_quota, player_quota)
        .with_population(
            2 * goalie_quota as usize,
            2 * player_quota as usize,
        )
        .with_max_arrival_delay(Duration::ZERO)
        .with_match_duration(Duration::ZERO)
        .with_observer(Arc::new(NullObserver))
        .start()
        .expect("valid config")
        .run()
        .expect("clean run");
    assert_eq!(report.teams_formed, 2);
    black_box(report);
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    // Thread spawn/join dominates; keep sample counts modest.
    group.sample_size(20);

    for (goalies, players) in [(1u32, 5u32), (2, 3), (2, 9)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{goalies}g{players}p")),
            &(goalies, players),
            |b, &(goalies, players)| {
                b.iter(|| run_once(goalies, players));
            },
        );
    }
    group.finish();
}

fn bench_formation_with_surplus(c: &mut Criterion) {
    // Late entities take the cheap path; this measures how much the extra
    // registrations cost on top of the base run.
    c.bench_function("full_run_with_late_entities", |b| {
        b.iter(|| {
            let report = SimulationBuilder::new()
                .with_quotas(1, 5)
                .with_population(4, 13)
                .with_max_arrival_delay(Duration::ZERO)
                .with_match_duration(Duration::ZERO)
                .with_observer(Arc::new(NullObserver))
                .start()
                .expect("valid config")
                .run()
                .expect("clean run");
            assert_eq!(report.late_count(), 5);
            black_box(report);
        });
    });
}

criterion_group!(benches, bench_full_run, bench_formation_with_surplus);
criterion_main!(benches);
