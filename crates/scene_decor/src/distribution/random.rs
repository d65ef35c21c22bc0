//! Uniform random points with an area-proportional count.
use glam::Vec2;
use mint::Vector2;
use rand::Rng as RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{rand01, sanitize_extent, Distribution, SamplePoint};
use crate::error::{Error, Result};

/// Uniform i.i.d. sampling over the footprint.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct RandomDistribution {
    /// Points per square unit.
    pub density: f32,
}

impl RandomDistribution {
    pub fn new(density: f32) -> Self {
        Self { density }
    }

    /// `max(1, ceil(area * density))`.
    pub fn count(&self, extent: Vec2) -> usize {
        let n = extent.x * extent.y * self.density.max(0.0);
        if n.is_finite() {
            (n.ceil() as usize).max(1)
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.density.is_finite() && self.density >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "random density must be finite and non-negative, got {}",
                self.density
            )));
        }
        Ok(())
    }
}

impl Distribution for RandomDistribution {
    fn distribute_limited(
        &self,
        extent: Vector2<f32>,
        rng: &mut dyn RngCore,
        limit: usize,
    ) -> Vec<SamplePoint> {
        let extent = sanitize_extent(extent);
        let count = self.count(extent).min(limit.max(1));
        (0..count)
            .map(|_| {
                let u = rand01(rng);
                let v = rand01(rng);
                SamplePoint::from_normalized(Vec2::new(u, v), extent)
            })
            .collect()
    }
}
