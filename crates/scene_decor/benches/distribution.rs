mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scene_decor::distribution::{
    Distribution, DistributionKind, GridDistribution, RandomDistribution, SimplexDistribution,
    StaggeredConcentricDistribution,
};

const EXTENTS: [f32; 4] = [1.0, 4.0, 16.0, 32.0];

fn strategies() -> Vec<DistributionKind> {
    vec![
        GridDistribution::new(Vec2::splat(0.25)).into(),
        RandomDistribution::new(16.0).into(),
        SimplexDistribution::new(Vec2::splat(4.0), 0.1, 7).into(),
        StaggeredConcentricDistribution::new(0.25).into(),
    ]
}

fn distribution_benches(c: &mut Criterion) {
    for strategy in strategies() {
        let mut group = c.benchmark_group(format!("distribution/{}", strategy.name()));

        for &side in &EXTENTS {
            let extent = Vec2::splat(side);
            let mut rng_est = StdRng::seed_from_u64(0xD15C ^ side.to_bits() as u64);
            let expected = strategy.distribute(extent.into(), &mut rng_est).len();
            group.throughput(common::elements_throughput(expected));

            let mut rng = StdRng::seed_from_u64(0x5EED ^ side.to_bits() as u64);
            group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
                b.iter(|| {
                    let points = strategy.distribute(extent.into(), &mut rng);
                    black_box(points.len());
                });
            });
        }

        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = distribution_benches
}
criterion_main!(benches);
