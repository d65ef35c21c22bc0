//! Distribution strategies producing sample points over an anchor footprint.
//!
//! A strategy receives the footprint extent (the planar rectangle, or a volume's XY size) and
//! returns points both in anchor-local coordinates (centered on the footprint) and normalized to
//! `[0, 1]` across it. Every strategy emits at least one point, even for degenerate extents.
use glam::Vec2;
use mint::Vector2;
use rand::Rng as RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod grid;
pub mod random;
pub mod simplex;
pub mod staggered;

pub use grid::GridDistribution;
pub use random::RandomDistribution;
pub use simplex::SimplexDistribution;
pub use staggered::StaggeredConcentricDistribution;

/// One generated sample point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    /// Position relative to the footprint center.
    pub local: Vec2,
    /// Position across the footprint, `(0, 0)` at the min corner and `(1, 1)` at the max corner.
    pub normalized: Vec2,
}

impl SamplePoint {
    /// Maps a normalized coordinate into the local space of `extent`.
    #[inline]
    pub fn from_normalized(normalized: Vec2, extent: Vec2) -> Self {
        Self {
            local: normalized * extent - extent * 0.5,
            normalized,
        }
    }

    /// The footprint center.
    #[inline]
    pub fn center(extent: Vec2) -> Self {
        Self::from_normalized(Vec2::splat(0.5), extent)
    }
}

/// Trait for point distribution over a footprint.
pub trait Distribution: Send + Sync {
    /// Generates at most `limit` points (at least one, even for a `limit` of zero). Strategies
    /// stop generating once the limit is reached instead of truncating afterwards.
    fn distribute_limited(
        &self,
        extent: Vector2<f32>,
        rng: &mut dyn RngCore,
        limit: usize,
    ) -> Vec<SamplePoint>;

    fn distribute(&self, extent: Vector2<f32>, rng: &mut dyn RngCore) -> Vec<SamplePoint> {
        self.distribute_limited(extent, rng, usize::MAX)
    }
}

/// All built-in strategies.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum DistributionKind {
    Grid(GridDistribution),
    Random(RandomDistribution),
    Simplex(SimplexDistribution),
    StaggeredConcentric(StaggeredConcentricDistribution),
}

impl DistributionKind {
    pub fn name(&self) -> &'static str {
        match self {
            DistributionKind::Grid(_) => "grid",
            DistributionKind::Random(_) => "random",
            DistributionKind::Simplex(_) => "simplex",
            DistributionKind::StaggeredConcentric(_) => "staggered-concentric",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            DistributionKind::Grid(d) => d.validate(),
            DistributionKind::Random(d) => d.validate(),
            DistributionKind::Simplex(d) => d.validate(),
            DistributionKind::StaggeredConcentric(d) => d.validate(),
        }
    }
}

impl Distribution for DistributionKind {
    fn distribute_limited(
        &self,
        extent: Vector2<f32>,
        rng: &mut dyn RngCore,
        limit: usize,
    ) -> Vec<SamplePoint> {
        match self {
            DistributionKind::Grid(d) => d.distribute_limited(extent, rng, limit),
            DistributionKind::Random(d) => d.distribute_limited(extent, rng, limit),
            DistributionKind::Simplex(d) => d.distribute_limited(extent, rng, limit),
            DistributionKind::StaggeredConcentric(d) => d.distribute_limited(extent, rng, limit),
        }
    }
}

impl From<GridDistribution> for DistributionKind {
    fn from(value: GridDistribution) -> Self {
        DistributionKind::Grid(value)
    }
}

impl From<RandomDistribution> for DistributionKind {
    fn from(value: RandomDistribution) -> Self {
        DistributionKind::Random(value)
    }
}

impl From<SimplexDistribution> for DistributionKind {
    fn from(value: SimplexDistribution) -> Self {
        DistributionKind::Simplex(value)
    }
}

impl From<StaggeredConcentricDistribution> for DistributionKind {
    fn from(value: StaggeredConcentricDistribution) -> Self {
        DistributionKind::StaggeredConcentric(value)
    }
}

/// Non-negative, finite footprint. Anything else collapses to zero on that axis.
#[inline]
pub(crate) fn sanitize_extent(extent: Vector2<f32>) -> Vec2 {
    let e = Vec2::from(extent).abs();
    Vec2::new(
        if e.x.is_finite() { e.x } else { 0.0 },
        if e.y.is_finite() { e.y } else { 0.0 },
    )
}

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}
