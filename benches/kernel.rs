//! Benchmarks for the CPU force kernel.
//!
//! The O(N²) neighbor scan dominates; this tracks how the reference
//! implementation scales with flock size. Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use gpuflock::kernel;
use gpuflock::params::SimulationParams;
use gpuflock::state::initial_state;

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_step");
    let params = SimulationParams::default();

    for count in [256u32, 1024, 4096] {
        let spawn = initial_state(count, 42);
        let mut positions_out = vec![Vec3::ZERO; count as usize];
        let mut velocities_out = vec![Vec3::ZERO; count as usize];

        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| {
                kernel::step(
                    black_box(&spawn.positions),
                    black_box(&spawn.velocities),
                    &mut positions_out,
                    &mut velocities_out,
                    &params,
                    1.0 / 60.0,
                );
            })
        });
    }

    group.finish();
}

fn bench_evaluate_forces(c: &mut Criterion) {
    let spawn = initial_state(4096, 42);
    let params = SimulationParams::default();

    c.bench_function("evaluate_forces_single_agent", |b| {
        b.iter(|| {
            black_box(kernel::evaluate_forces(
                black_box(0),
                &spawn.positions,
                &spawn.velocities,
                &params,
            ))
        })
    });
}

criterion_group!(benches, bench_step, bench_evaluate_forces);
criterion_main!(benches);
