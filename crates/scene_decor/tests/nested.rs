use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec2, Vec3};
use scene_decor::prelude::*;

fn floor_scene() -> MemoryScene {
    let mut scene = MemoryScene::new();
    scene.add_room(1, Vec3::new(-5.0, -1.0, -5.0), Vec3::new(5.0, 5.0, 5.0));
    scene.add_anchor(
        RoomId(1),
        MemoryAnchor::plane(
            1,
            AnchorLabels::FLOOR,
            Pose::new(Vec3::ZERO, Quat::from_rotation_x(-FRAC_PI_2)),
            Vec2::splat(2.0),
        ),
    );
    scene
}

fn crate_box(height: f32) -> AnchorExtent {
    AnchorExtent::Volume {
        min: Vec3::new(-0.5, -0.5, 0.0),
        max: Vec3::new(0.5, 0.5, height),
    }
}

/// A rule stacking crates on crates, one per surface.
fn stacking_rule(limit: u32) -> DecorationRule {
    DecorationRule::new("stack")
        .with_labels(AnchorLabels::FLOOR)
        .with_prefab_entry(
            PrefabEntry::new("crate")
                .with_footprint(crate_box(0.5))
                .with_decorator("stack"),
        )
        .with_distribution(GridDistribution::new(Vec2::splat(2.0)))
        .with_hierarchy(SpawnHierarchy::Decorator)
        .with_recursion_limit(limit)
}

fn compile(rules: RuleSet, masks: &MaskLibrary) -> CompiledRules {
    rules.compile(&masks.compile(&TextureRegistry::new()).unwrap())
}

#[test]
fn self_nesting_stops_at_the_recursion_limit() {
    let scene = floor_scene();
    let mut pool = SimplePool::new();
    let textures = TextureRegistry::new();
    let mut sink = VecSink::new();
    let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures).with_sink(&mut sink);

    let rules = compile(RuleSet::new().with(stacking_rule(2)), &MaskLibrary::new());
    let mut decorator = Decorator::new(DecoratorConfig::default(), rules).unwrap();
    let report = decorator
        .decorate_anchor("stack", AnchorId(1), &mut ctx)
        .unwrap();
    drop(ctx);

    assert_eq!(report.spawned, 2);
    assert_eq!(report.sites, 2);
    assert_eq!(report.recursion_stops, 1);
    assert_eq!(sink.count(DecorEventKind::RecursionLimitReached), 1);

    let mut depths: Vec<u32> = decorator.index().iter().map(|r| r.depth).collect();
    depths.sort_unstable();
    assert_eq!(depths, vec![0, 1]);
    // Every nested instance stays owned by the top-level anchor.
    assert!(decorator.index().iter().all(|r| r.anchor == AnchorId(1)));
}

#[test]
fn expired_hosts_take_their_nested_instances_along() {
    let scene = floor_scene();
    let mut pool = SimplePool::new();
    let textures = TextureRegistry::new();
    let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures);

    let table = PrefabEntry::new("table")
        .with_footprint(crate_box(0.8))
        .with_decorator("cups");
    let rules = RuleSet::new()
        .with(
            DecorationRule::new("tables")
                .with_labels(AnchorLabels::FLOOR)
                .with_prefab_entry(table)
                .with_distribution(GridDistribution::new(Vec2::splat(2.0)))
                .with_lifetime(1.0),
        )
        .with(
            DecorationRule::new("cups")
                .with_prefab("cup")
                .with_hierarchy(SpawnHierarchy::Decorator)
                .with_recursion_limit(2)
                .with_distribution(GridDistribution::new(Vec2::splat(1.0))),
        );
    let mut decorator =
        Decorator::new(DecoratorConfig::default(), compile(rules, &MaskLibrary::new())).unwrap();
    let report = decorator.decorate_rule("tables", &mut ctx).unwrap();
    assert_eq!(report.spawned, 2);
    assert!(decorator.index().iter().any(|r| r.expires_at.is_none()));

    assert_eq!(decorator.tick(2.0, &mut ctx), 2);
    drop(ctx);
    assert!(decorator.index().is_empty());
    assert_eq!(pool.live_count(), 0);
}

#[test]
fn higher_limit_stacks_higher() {
    let scene = floor_scene();
    let mut pool = SimplePool::new();
    let textures = TextureRegistry::new();
    let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures);

    let rules = compile(RuleSet::new().with(stacking_rule(3)), &MaskLibrary::new());
    let mut decorator = Decorator::new(DecoratorConfig::default(), rules).unwrap();
    let report = decorator.decorate_rule("stack", &mut ctx).unwrap();

    assert_eq!(report.spawned, 3);
    let mut heights: Vec<f32> = decorator
        .index()
        .iter()
        .map(|r| r.transform.position.y)
        .collect();
    heights.sort_by(f32::total_cmp);
    for (h, expected) in heights.iter().zip([0.0, 0.5, 1.0]) {
        assert!((h - expected).abs() < 1e-4, "{h} != {expected}");
    }

    // Clearing the anchor takes the whole stack with it.
    assert_eq!(decorator.clear_anchor(AnchorId(1), &mut ctx), 3);
}

#[test]
fn nested_footprint_follows_host_scale() {
    let scene = floor_scene();
    let mut pool = SimplePool::new();
    let textures = TextureRegistry::new();
    let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures);

    let masks = MaskLibrary::new().with("double", MaskSpec::Constant { value: 2.0 });
    let rules = RuleSet::new()
        .with(
            DecorationRule::new("tables")
                .with_labels(AnchorLabels::FLOOR)
                .with_prefab_entry(
                    PrefabEntry::new("table")
                        .with_footprint(crate_box(0.4))
                        .with_decorator("cups"),
                )
                .with_distribution(GridDistribution::new(Vec2::splat(2.0)))
                .with_modifier(ModifierSpec::ScaleUniform {
                    layer: scene_decor::mask::library::layer("double"),
                }),
        )
        .with(
            DecorationRule::new("cups")
                .with_prefab("cup")
                .with_distribution(GridDistribution::new(Vec2::splat(1.0)))
                .with_recursion_limit(2),
        );
    let rules = compile(rules, &masks);
    let mut decorator = Decorator::new(DecoratorConfig::default(), rules).unwrap();
    let report = decorator.decorate_rule("tables", &mut ctx).unwrap();

    // A doubled table is 2 x 2 on top: four cups at height 0.8.
    assert_eq!(report.spawned, 5);
    let cups: Vec<&SpawnedInstanceRecord> = decorator
        .index()
        .iter()
        .filter(|r| r.prefab.as_str() == "cup")
        .collect();
    assert_eq!(cups.len(), 4);
    assert!(cups
        .iter()
        .all(|c| (c.transform.position.y - 0.8).abs() < 1e-4));
}

#[test]
fn placements_are_deterministic_per_seed() {
    let scene = floor_scene();
    let textures = TextureRegistry::new();

    let run = |base_seed: u64| -> Vec<(String, Vec3)> {
        let mut pool = SimplePool::new();
        let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures);
        let rules = RuleSet::new().with(
            DecorationRule::new("clutter")
                .with_labels(AnchorLabels::FLOOR)
                .with_prefab_entry(PrefabEntry::new("a").with_weight(1.0))
                .with_prefab_entry(PrefabEntry::new("b").with_weight(1.0))
                .with_distribution(RandomDistribution::new(4.0)),
        );
        let mut decorator = Decorator::new(
            DecoratorConfig::new(base_seed),
            compile(rules, &MaskLibrary::new()),
        )
        .unwrap();
        decorator.decorate_rule("clutter", &mut ctx).unwrap();
        let mut placed: Vec<(String, Vec3)> = decorator
            .index()
            .iter()
            .map(|r| (r.prefab.as_str().to_string(), r.transform.position))
            .collect();
        placed.sort_by(|a, b| a.1.x.total_cmp(&b.1.x).then(a.1.z.total_cmp(&b.1.z)));
        placed
    };

    let a = run(5);
    assert_eq!(a.len(), 16);
    assert_eq!(a, run(5));
    assert_ne!(a, run(6));
}
