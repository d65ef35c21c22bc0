use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scene_decor::prelude::*;
use scene_decor_examples::{init_tracing, render_points_to_png, PrefabStyle, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    // One 4 x 3 footprint, sampled by every strategy.
    let extent = Vec2::new(4.0, 3.0);
    let half = extent * 0.5;
    let config = RenderConfig::new((800, 600), -half, half).with_background([250, 250, 245]);

    let strategies: Vec<(DistributionKind, [u8; 3])> = vec![
        (GridDistribution::new(Vec2::splat(0.25)).into(), [40, 120, 240]),
        (RandomDistribution::new(12.0).into(), [240, 140, 40]),
        (
            SimplexDistribution::new(Vec2::splat(3.0), 0.15, 7).with_frequency(2.0).into(),
            [40, 170, 90],
        ),
        (StaggeredConcentricDistribution::new(0.2).into(), [170, 60, 170]),
    ];

    for (strategy, color) in strategies {
        strategy.validate()?;
        let mut rng = StdRng::seed_from_u64(42);
        let points: Vec<Vec2> = strategy
            .distribute(extent.into(), &mut rng)
            .into_iter()
            .map(|p| p.local)
            .collect();
        info!("{}: {} points", strategy.name(), points.len());
        render_points_to_png(
            &points,
            &config,
            PrefabStyle::new(color, 3),
            format!("distributions-compare-{}.png", strategy.name()),
        )?;
    }

    Ok(())
}
