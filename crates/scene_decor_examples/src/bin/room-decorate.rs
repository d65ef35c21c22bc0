use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec2, Vec3, Vec4};
use scene_decor::mask::library::layer;
use scene_decor::prelude::*;
use scene_decor_examples::{init_tracing, render_instances_to_png, PrefabStyle, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut scene = build_room();
    let textures = build_textures();
    let masks = build_masks().compile(&textures)?;
    let rules = build_rules().compile(&masks);
    for (rule, error) in rules.errors() {
        info!("Rule '{}' left out: {}", rule, error);
    }

    let mut pool = SimplePool::with_default_capacity(512);
    let mut sink = VecSink::new().only([
        DecorEventKind::AnchorDecorated,
        DecorEventKind::PoolExhausted,
        DecorEventKind::InstancesReleased,
    ]);
    let mut decorator = Decorator::new(DecoratorConfig::new(2024), rules)?;

    decorator.enqueue(SceneEvent::SceneLoaded);
    let report = {
        let mut ctx =
            DecorContext::new(&scene, &scene, &mut pool, &textures).with_sink(&mut sink);
        decorator.process_events(&mut ctx)
    };
    info!(
        "Initial pass: {} spawned on {} anchor(s), {} point(s), {} rejected, {} miss(es).",
        report.spawned, report.anchors, report.points, report.rejected, report.misses
    );

    let config = RenderConfig::new((900, 900), Vec2::splat(-3.5), Vec2::splat(3.5))
        .with_background([250, 248, 240])
        .with_style("pebble", PrefabStyle::new([120, 120, 120], 2))
        .with_style("plant", PrefabStyle::new([50, 150, 60], 5))
        .with_style("table", PrefabStyle::new([140, 90, 40], 12))
        .with_style("tray", PrefabStyle::new([90, 60, 30], 6))
        .with_style("cup", PrefabStyle::new([220, 60, 60], 4))
        .with_style("frame", PrefabStyle::new([40, 80, 200], 4))
        .with_style("candle", PrefabStyle::new([240, 200, 40], 3));
    render_instances_to_png(decorator.index().iter(), &config, "room-decorate.png")?;

    // Shrink the table; its decoration is rebuilt on the smaller top.
    let shrunk = scene.update_anchor(
        AnchorId(3),
        table_pose(),
        AnchorExtent::Volume {
            min: Vec3::new(-0.3, -0.3, 0.0),
            max: Vec3::new(0.3, 0.3, 0.75),
        },
    );
    decorator.enqueue(shrunk.ok_or_else(|| anyhow::anyhow!("table anchor missing"))?);

    let mut ctx = DecorContext::new(&scene, &scene, &mut pool, &textures).with_sink(&mut sink);
    let report = decorator.process_events(&mut ctx);
    info!(
        "Table update: released {}, spawned {}.",
        report.released, report.spawned
    );

    // Pebbles fade out after their lifetime.
    let expired = decorator.tick(5.0, &mut ctx);
    info!("{} pebble(s) expired.", expired);

    // Unloading keeps the persistent plants.
    let report = decorator.handle_event(SceneEvent::SceneUnloaded, &mut ctx);
    drop(ctx);
    info!(
        "Scene unloaded: released {}, {} persistent instance(s) kept.",
        report.released,
        decorator.index().len()
    );

    for event in sink.as_slice() {
        if let DecorEvent::AnchorDecorated { rule, anchor, report } = event {
            info!("{} on anchor {}: {} spawned", rule, anchor, report.spawned);
        }
    }
    Ok(())
}

fn floor_pose() -> Pose {
    Pose::new(Vec3::ZERO, Quat::from_rotation_x(-FRAC_PI_2))
}

fn table_pose() -> Pose {
    Pose::new(Vec3::new(1.5, 0.0, -1.0), Quat::from_rotation_x(-FRAC_PI_2))
}

/// A 6 x 6 room with a floor, the north wall and a table.
fn build_room() -> MemoryScene {
    let mut scene = MemoryScene::new();
    scene.add_room(1, Vec3::new(-3.0, -0.5, -3.0), Vec3::new(3.0, 3.0, 3.0));
    let room = RoomId(1);

    scene.add_anchor(
        room,
        MemoryAnchor::plane(1, AnchorLabels::FLOOR, floor_pose(), Vec2::splat(6.0)),
    );
    // Wall at z = -3 facing into the room.
    scene.add_anchor(
        room,
        MemoryAnchor::plane(
            2,
            AnchorLabels::WALL_FACE,
            Pose::from_position(Vec3::new(0.0, 1.25, -3.0)),
            Vec2::new(6.0, 2.5),
        ),
    );
    scene.add_anchor(
        room,
        MemoryAnchor::volume(
            3,
            AnchorLabels::TABLE,
            table_pose(),
            Vec3::new(-0.6, -0.4, 0.0),
            Vec3::new(0.6, 0.4, 0.75),
        ),
    );
    scene
}

fn build_textures() -> TextureRegistry {
    let mut textures = TextureRegistry::new();
    // Headings swirl around the room center.
    textures.register(
        "headings",
        RasterTexture::from_fn(64, 64, Vec2::splat(6.0), |u, v| {
            let d = Vec2::new(u - 0.5, v - 0.5);
            let angle = d.y.atan2(d.x) / std::f32::consts::TAU + 0.5;
            Vec4::new(angle, 0.0, 0.0, 1.0)
        }),
    );
    textures
}

fn build_masks() -> MaskLibrary {
    MaskLibrary::new()
        .with("slope", MaskSpec::Slope)
        .with("in-room", MaskSpec::InsideRoom)
        .with(
            "patches",
            MaskSpec::SimplexNoise {
                transform: Affine2D::IDENTITY,
                frequency: 0.6,
                seed: 9,
            },
        )
        .with(
            "cells",
            MaskSpec::CellularNoise {
                transform: Affine2D::IDENTITY,
                frequency: 1.5,
                seed: 4,
            },
        )
        .with(
            "clumps",
            MaskSpec::Composite {
                op: BlendOp::Mul,
                transform: Affine2D::IDENTITY,
                layers: vec![layer("patches"), layer("cells")],
            },
        )
        .with("size", MaskSpec::Random { seed: 17 })
        .with(
            "sparse",
            MaskSpec::Stochastic {
                probability: 0.5,
                seed: 3,
            },
        )
}

fn build_rules() -> RuleSet {
    let size = MaskLayer::new(
        "size".to_string(),
        MaskParams::WIDE.with_scale(0.6).with_offset(0.7),
    );
    RuleSet::new()
        .with(
            DecorationRule::new("pebbles")
                .with_labels(AnchorLabels::FLOOR)
                .with_prefab("pebble")
                .with_distribution(SimplexDistribution::new(Vec2::splat(4.0), 0.12, 5))
                .with_constraint(ConstraintSpec::value("flat", "slope".into(), 0.0, 15.0))
                .with_constraint(ConstraintSpec::boolean("in-room", "in-room".into()))
                .with_constraint(ConstraintSpec::value("clumps", "clumps".into(), 0.15, 1.0))
                .with_modifier(ModifierSpec::ScaleUniform { layer: size.clone() })
                .with_modifier(ModifierSpec::KeepUprightWithSurface)
                .with_lifetime(4.0)
                .with_seed(1),
        )
        .with(
            DecorationRule::new("plants")
                .with_labels(AnchorLabels::FLOOR)
                .with_prefab_entry(PrefabEntry::new("plant").with_weight(3.0))
                .with_prefab_entry(PrefabEntry::new("pebble").with_weight(1.0))
                .with_distribution(StaggeredConcentricDistribution::new(0.9))
                .with_constraint(ConstraintSpec::boolean("sparse", "sparse".into()))
                .with_modifier(ModifierSpec::RotateToColorMap {
                    texture: "headings".into(),
                    channel: TextureChannel::R,
                    transform: Affine2D::IDENTITY,
                    max_degrees: 360.0,
                })
                .with_modifier(ModifierSpec::DontDestroy)
                .with_seed(2),
        )
        .with(
            DecorationRule::new("frames")
                .with_labels(AnchorLabels::WALL_FACE)
                .with_prefab("frame")
                .with_distribution(GridDistribution::new(Vec2::new(1.5, 2.5)))
                .with_hierarchy(SpawnHierarchy::Room)
                .with_modifier(ModifierSpec::KeepUprightWithAnchor),
        )
        .with(
            DecorationRule::new("tables")
                .with_labels(AnchorLabels::TABLE)
                .with_prefab_entry(
                    PrefabEntry::new("tray")
                        .with_footprint(AnchorExtent::Volume {
                            min: Vec3::new(-0.25, -0.25, 0.0),
                            max: Vec3::new(0.25, 0.25, 0.05),
                        })
                        .with_decorator("cups"),
                )
                .with_distribution(GridDistribution::new(Vec2::splat(0.6)))
                .with_pool_size(8),
        )
        .with(
            DecorationRule::new("cups")
                .with_prefab_entry(PrefabEntry::new("cup").with_weight(2.0))
                .with_prefab_entry(PrefabEntry::new("candle"))
                .with_distribution(GridDistribution::new(Vec2::splat(0.25)))
                .with_hierarchy(SpawnHierarchy::Decorator)
                .with_recursion_limit(2)
                .with_modifier(ModifierSpec::ScaleUniform { layer: size }),
        )
}
