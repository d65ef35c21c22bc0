//! Interior grid displaced by simplex noise.
use glam::Vec2;
use mint::Vector2;
use rand::Rng as RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{sanitize_extent, Distribution, SamplePoint};
use crate::error::{Error, Result};
use crate::mask::noise::SimplexNoise;

// Decorrelates the y displacement from the x displacement.
const Y_CHANNEL_OFFSET: Vec2 = Vec2::new(31.416, 47.853);

/// Regular interior grid whose nodes are pushed around by a 2D noise vector.
///
/// With `cells = round(extent * points_per_unit)` per axis, nodes sit at normalized
/// `i / cells` for `i in 1..cells`, so nothing lands on the boundary. Axes narrower than two
/// cells collapse to the center line. Each node's normalized coordinate is then displaced by up
/// to `noise_offset_radius` world units and clamped to the footprint.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct SimplexDistribution {
    pub points_per_unit: Vec2,
    /// Maximum displacement in world units.
    pub noise_offset_radius: f32,
    /// Noise frequency relative to the node positions in world units.
    pub frequency: f32,
    pub seed: u64,
}

impl SimplexDistribution {
    pub fn new(points_per_unit: Vec2, noise_offset_radius: f32, seed: u64) -> Self {
        Self {
            points_per_unit,
            noise_offset_radius,
            frequency: 1.0,
            seed,
        }
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    fn cells(extent: f32, points_per_unit: f32) -> usize {
        let c = (extent * points_per_unit).round();
        if c.is_finite() && c > 0.0 {
            c as usize
        } else {
            0
        }
    }

    fn axis_len(cells: usize) -> usize {
        cells.saturating_sub(1).max(1)
    }

    fn axis_node(cells: usize, i: usize) -> f32 {
        if cells < 2 {
            0.5
        } else {
            (i + 1) as f32 / cells as f32
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ppu = self.points_per_unit;
        if !(ppu.x > 0.0 && ppu.y > 0.0 && ppu.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "simplex points_per_unit must be positive and finite, got {:?}",
                ppu
            )));
        }
        if !(self.noise_offset_radius.is_finite() && self.noise_offset_radius >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "simplex noise_offset_radius must be finite and non-negative, got {}",
                self.noise_offset_radius
            )));
        }
        if !self.frequency.is_finite() {
            return Err(Error::InvalidConfig("simplex frequency must be finite".into()));
        }
        Ok(())
    }
}

impl Distribution for SimplexDistribution {
    fn distribute_limited(
        &self,
        extent: Vector2<f32>,
        _rng: &mut dyn RngCore,
        limit: usize,
    ) -> Vec<SamplePoint> {
        let extent = sanitize_extent(extent);
        let cells_x = Self::cells(extent.x, self.points_per_unit.x);
        let cells_y = Self::cells(extent.y, self.points_per_unit.y);
        let columns = Self::axis_len(cells_x);
        let count = columns
            .saturating_mul(Self::axis_len(cells_y))
            .min(limit.max(1));
        let noise = SimplexNoise::new(self.seed);

        // Displacement is specified in world units; convert per axis.
        let to_normalized = Vec2::new(
            if extent.x > 0.0 { self.noise_offset_radius / extent.x } else { 0.0 },
            if extent.y > 0.0 { self.noise_offset_radius / extent.y } else { 0.0 },
        );

        (0..count)
            .map(|k| {
                let node = Vec2::new(
                    Self::axis_node(cells_x, k % columns),
                    Self::axis_node(cells_y, k / columns),
                );
                let q = node * extent * self.frequency;
                let d = Vec2::new(noise.sample(q), noise.sample(q + Y_CHANNEL_OFFSET));
                let normalized = (node + d * to_normalized).clamp(Vec2::ZERO, Vec2::ONE);
                SamplePoint::from_normalized(normalized, extent)
            })
            .collect()
    }
}
