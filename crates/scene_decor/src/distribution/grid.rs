//! Regular grid of cell centers.
use glam::Vec2;
use mint::Vector2;
use rand::Rng as RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{sanitize_extent, Distribution, SamplePoint};
use crate::error::{Error, Result};

/// One point per grid cell center.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct GridDistribution {
    /// Target distance between neighboring points per axis.
    pub spacing: Vec2,
}

impl GridDistribution {
    pub fn new(spacing: Vec2) -> Self {
        Self { spacing }
    }

    /// Resolution per axis: `max(1, ceil(extent / spacing))`, saturating at `usize::MAX`.
    pub fn resolution(&self, extent: Vec2) -> (usize, usize) {
        let axis = |e: f32, s: f32| {
            let r = (e / s).ceil();
            if s.is_finite() && s > 0.0 && !r.is_nan() {
                // Float-to-int casts saturate.
                (r as usize).max(1)
            } else {
                1
            }
        };
        (axis(extent.x, self.spacing.x), axis(extent.y, self.spacing.y))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.spacing.x > 0.0 && self.spacing.y > 0.0 && self.spacing.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "grid spacing must be positive and finite, got {:?}",
                self.spacing
            )));
        }
        Ok(())
    }
}

impl Distribution for GridDistribution {
    fn distribute_limited(
        &self,
        extent: Vector2<f32>,
        _rng: &mut dyn RngCore,
        limit: usize,
    ) -> Vec<SamplePoint> {
        let extent = sanitize_extent(extent);
        let (res_x, res_y) = self.resolution(extent);
        let count = res_x.saturating_mul(res_y).min(limit.max(1));

        // Row-major: x varies fastest.
        (0..count)
            .map(|k| {
                let (i, j) = (k % res_x, k / res_x);
                let normalized = Vec2::new(
                    (i as f32 + 0.5) / res_x as f32,
                    (j as f32 + 0.5) / res_y as f32,
                );
                SamplePoint::from_normalized(normalized, extent)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn point_count_is_product_of_resolutions() {
        let mut rng = StdRng::seed_from_u64(0);
        let grid = GridDistribution::new(Vec2::new(1.0, 1.0));
        let pts = grid.distribute(Vec2::new(3.0, 2.0).into(), &mut rng);
        assert_eq!(grid.resolution(Vec2::new(3.0, 2.0)), (3, 2));
        assert_eq!(pts.len(), 6);
    }

    #[test]
    fn limit_stops_generation_early() {
        let mut rng = StdRng::seed_from_u64(0);
        let grid = GridDistribution::new(Vec2::splat(1.0 / 256.0));
        let extent = Vec2::new(8.0, 8.0);
        assert_eq!(grid.resolution(extent), (2048, 2048));
        let pts = grid.distribute_limited(extent.into(), &mut rng, 3000);
        assert_eq!(pts.len(), 3000);
        // The first row is complete, the second one cut short.
        assert_eq!(pts[2047].normalized.y, pts[0].normalized.y);
        assert!(pts[2048].normalized.y > pts[0].normalized.y);
        assert_eq!(pts[2999].normalized.y, pts[2048].normalized.y);
        assert_eq!(grid.distribute_limited(extent.into(), &mut rng, 0).len(), 1);
    }

    #[test]
    fn huge_resolutions_saturate_instead_of_overflowing() {
        let mut rng = StdRng::seed_from_u64(0);
        let grid = GridDistribution::new(Vec2::splat(1e-30));
        let extent = Vec2::splat(1e30);
        assert_eq!(grid.resolution(extent), (usize::MAX, usize::MAX));
        let pts = grid.distribute_limited(extent.into(), &mut rng, 8);
        assert_eq!(pts.len(), 8);
    }

    #[test]
    fn partial_cells_round_up() {
        let grid = GridDistribution::new(Vec2::new(1.0, 0.4));
        assert_eq!(grid.resolution(Vec2::new(2.5, 1.0)), (3, 3));
    }

    #[test]
    fn emits_cell_centers_around_origin() {
        let mut rng = StdRng::seed_from_u64(0);
        let grid = GridDistribution::new(Vec2::new(1.0, 1.0));
        let pts = grid.distribute(Vec2::new(2.0, 1.0).into(), &mut rng);
        assert_eq!(pts[0].local, Vec2::new(-0.5, 0.0));
        assert_eq!(pts[1].local, Vec2::new(0.5, 0.0));
        assert_eq!(pts[0].normalized, Vec2::new(0.25, 0.5));
    }

    #[test]
    fn zero_extent_yields_the_center() {
        let mut rng = StdRng::seed_from_u64(0);
        let grid = GridDistribution::new(Vec2::new(1.0, 1.0));
        let pts = grid.distribute(Vec2::ZERO.into(), &mut rng);
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].local, Vec2::ZERO);
    }

    #[test]
    fn non_positive_spacing_fails_validation() {
        assert!(GridDistribution::new(Vec2::new(0.0, 1.0)).validate().is_err());
        assert!(GridDistribution::new(Vec2::new(0.5, 0.5)).validate().is_ok());
    }
}
