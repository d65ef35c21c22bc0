mod common;

use std::f32::consts::FRAC_PI_2;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Quat, Vec2, Vec3};
use scene_decor::prelude::*;

const FLOOR_SIDES: [f32; 3] = [2.0, 8.0, 16.0];

fn floor_scene(side: f32) -> MemoryScene {
    let mut scene = MemoryScene::new();
    let half = side * 0.5 + 1.0;
    scene.add_room(1, Vec3::new(-half, -1.0, -half), Vec3::new(half, 3.0, half));
    scene.add_anchor(
        RoomId(1),
        MemoryAnchor::plane(
            1,
            AnchorLabels::FLOOR,
            Pose::new(Vec3::ZERO, Quat::from_rotation_x(-FRAC_PI_2)),
            Vec2::splat(side),
        ),
    );
    scene
}

fn rules() -> CompiledRules {
    let masks = MaskLibrary::new()
        .with("flat", MaskSpec::Slope)
        .with(
            "patches",
            MaskSpec::SimplexNoise {
                transform: Affine2D::IDENTITY,
                frequency: 0.5,
                seed: 3,
            },
        )
        .compile(&TextureRegistry::new())
        .expect("masks compile");
    RuleSet::new()
        .with(
            DecorationRule::new("grass")
                .with_labels(AnchorLabels::FLOOR)
                .with_prefab("grass")
                .with_distribution(GridDistribution::new(Vec2::splat(0.25)))
                .with_constraint(ConstraintSpec::value("flat", "flat".into(), 0.0, 20.0))
                .with_constraint(ConstraintSpec::value("patches", "patches".into(), 0.4, 1.0))
                .with_modifier(ModifierSpec::KeepUprightWithSurface),
        )
        .compile(&masks)
}

fn decorate_benches(c: &mut Criterion) {
    let rules = std::sync::Arc::new(rules());
    let textures = TextureRegistry::new();
    let mut group = c.benchmark_group("decorate/floor");

    for &side in &FLOOR_SIDES {
        let scene = floor_scene(side);
        let points = (side / 0.25).ceil() as usize;
        group.throughput(common::elements_throughput(points * points));

        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
            b.iter(|| {
                let mut pool = SimplePool::new();
                let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures);
                let mut decorator =
                    Decorator::new(DecoratorConfig::new(1), rules.clone()).expect("config");
                let report = decorator.decorate_rule("grass", &mut ctx).expect("rule");
                black_box(report.spawned);
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = decorate_benches
}
criterion_main!(benches);
