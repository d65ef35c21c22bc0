//! Mask engine: scalar fields and predicates evaluated per [`Candidate`].
//!
//! A [`Mask`] is a compiled, immutable node. Authoring happens through
//! [`library::MaskSpec`] entries in a [`library::MaskLibrary`], which resolves layer and texture
//! references up front so sampling never encounters a dangling reference.
//!
//! Every mask exposes two independent paths:
//! - [`Mask::sample`]: raw value, times `scale`, plus `offset`, clamped to `[limit_min, limit_max]`.
//! - [`Mask::check`]: a boolean predicate used by `Bool`-mode constraints.
//!
//! Geometry-derived masks (height, slope, distances, proximity, inside-room) only read what the
//! placement resolver stored on the candidate; they never query the scene themselves.
use std::sync::Arc;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::decor::seed::hash01;
use crate::mask::affine::Affine2D;
use crate::mask::noise::{cellular, SimplexNoise};
use crate::mask::texture::{TextureChannel, TextureHandle};
use crate::placement::candidate::Candidate;
use crate::placement::Targets;

pub mod affine;
pub mod library;
pub mod noise;
pub mod texture;

pub type MaskId = String;

/// Shared handle to a compiled mask.
pub type MaskRef = Arc<Mask>;

/// Output mapping applied to a raw mask value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskParams {
    pub limit_min: f32,
    pub limit_max: f32,
    pub scale: f32,
    pub offset: f32,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self::WIDE
    }
}

impl MaskParams {
    /// Identity mapping with an effectively unbounded clamp.
    pub const WIDE: Self = Self {
        limit_min: f32::MIN,
        limit_max: f32::MAX,
        scale: 1.0,
        offset: 0.0,
    };

    pub fn new(limit_min: f32, limit_max: f32, scale: f32, offset: f32) -> Self {
        Self {
            limit_min,
            limit_max,
            scale,
            offset,
        }
    }

    pub fn with_limits(mut self, limit_min: f32, limit_max: f32) -> Self {
        self.limit_min = limit_min;
        self.limit_max = limit_max;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Maps a raw value: `raw * scale + offset`, clamped to the limits.
    #[inline]
    pub fn map(&self, raw: f32) -> f32 {
        (raw * self.scale + self.offset)
            .max(self.limit_min)
            .min(self.limit_max)
    }

    pub fn is_valid(&self) -> bool {
        self.limit_min <= self.limit_max && self.scale.is_finite() && self.offset.is_finite()
    }
}

/// Reduction used by composite masks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    /// Unweighted mean of the mapped layer samples.
    Avg,
    Min,
    Max,
    Mul,
}

/// Local axis selector.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// One input of a composite mask together with its output mapping.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct MaskLayer<M> {
    pub mask: M,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: MaskParams,
}

impl<M> MaskLayer<M> {
    pub fn new(mask: M, params: MaskParams) -> Self {
        Self { mask, params }
    }
}

/// Compiled mask node.
#[derive(Clone, Debug)]
pub enum Mask {
    Constant {
        value: f32,
    },
    /// Uniform value in `[0, 1)` hashed from the candidate seed.
    Random {
        seed: u64,
    },
    CellularNoise {
        transform: Affine2D,
        frequency: f32,
        seed: u64,
    },
    SimplexNoise {
        transform: Affine2D,
        frequency: f32,
        noise: SimplexNoise,
    },
    /// World-space height of the hit point.
    Height,
    /// Angle in degrees between the hit normal and the reversed cast direction.
    Slope,
    /// Distance from the hit point to the anchor surface; checks within `tolerance`.
    AnchorDistance {
        tolerance: f32,
    },
    /// Per-axis face distance; checks that the hit lies within the anchor's span on `axis`.
    AnchorComponentDistance {
        axis: Axis,
    },
    /// Hit distance along the ray; checks that the hit came from one of `targets`.
    ColliderProximity {
        targets: Targets,
    },
    InsideRoom,
    Composite {
        op: BlendOp,
        transform: Affine2D,
        layers: Vec<MaskLayer<MaskRef>>,
    },
    /// Texture lookup at the transformed local position.
    Cookie {
        transform: Affine2D,
        texture: TextureHandle,
        channel: TextureChannel,
    },
    /// Random value; checks with the given pass probability.
    Stochastic {
        probability: f32,
        seed: u64,
    },
    /// Texture lookup at the hit point's world XZ, relative to `origin`.
    SpaceMap {
        texture: TextureHandle,
        channel: TextureChannel,
        origin: Vec2,
        threshold: f32,
    },
}

impl Mask {
    /// Returns the 2D placement transform for masks that sample the local position.
    pub fn transform(&self) -> Option<&Affine2D> {
        match self {
            Mask::CellularNoise { transform, .. }
            | Mask::SimplexNoise { transform, .. }
            | Mask::Composite { transform, .. }
            | Mask::Cookie { transform, .. } => Some(transform),
            _ => None,
        }
    }

    /// Samples the mask and maps the result: `clamp(raw * scale + offset, limit_min, limit_max)`.
    pub fn sample(
        &self,
        candidate: &Candidate,
        limit_min: f32,
        limit_max: f32,
        scale: f32,
        offset: f32,
    ) -> f32 {
        MaskParams::new(limit_min, limit_max, scale, offset).map(self.raw(candidate))
    }

    /// [`Mask::sample`] with a parameter bundle.
    #[inline]
    pub fn sample_with(&self, candidate: &Candidate, params: &MaskParams) -> f32 {
        params.map(self.raw(candidate))
    }

    /// Unmapped value at the candidate's local position.
    #[inline]
    pub fn raw(&self, candidate: &Candidate) -> f32 {
        self.raw_at(candidate, candidate.local_pos)
    }

    /// Unmapped value with `p` standing in for the candidate's local position. 2D masks apply
    /// their own transform to `p`; other masks ignore it.
    pub fn raw_at(&self, candidate: &Candidate, p: Vec2) -> f32 {
        match self {
            Mask::Constant { value } => *value,
            Mask::Random { seed } => hash01(*seed, candidate.seed),
            Mask::CellularNoise {
                transform,
                frequency,
                seed,
            } => cellular(transform.apply(p) * *frequency, *seed),
            Mask::SimplexNoise {
                transform,
                frequency,
                noise,
            } => noise.sample01(transform.apply(p) * *frequency),
            Mask::Height => candidate.hit.point.y,
            Mask::Slope => candidate.slope,
            Mask::AnchorDistance { .. } => candidate.anchor_dist,
            Mask::AnchorComponentDistance { axis } => candidate.anchor_comp_dists[axis.index()],
            Mask::ColliderProximity { .. } => candidate.hit.distance.abs(),
            Mask::InsideRoom => {
                if candidate.inside_room {
                    1.0
                } else {
                    0.0
                }
            }
            Mask::Composite {
                op,
                transform,
                layers,
            } => blend(*op, candidate, transform.apply(p), layers),
            Mask::Cookie {
                transform,
                texture,
                channel,
            } => texture.sample(*channel, transform.apply(p)),
            Mask::Stochastic { seed, .. } => hash01(*seed, candidate.seed),
            Mask::SpaceMap {
                texture,
                channel,
                origin,
                ..
            } => {
                let world = Vec2::new(candidate.hit.point.x, candidate.hit.point.z);
                texture.sample(*channel, world - *origin)
            }
        }
    }

    /// Boolean predicate, independent of the numeric path.
    pub fn check(&self, candidate: &Candidate) -> bool {
        match self {
            Mask::Constant { value } => *value > 0.0,
            Mask::AnchorDistance { tolerance } => candidate.anchor_dist <= *tolerance,
            Mask::AnchorComponentDistance { axis } => {
                candidate.anchor_comp_dists[axis.index()] <= 0.0
            }
            Mask::ColliderProximity { targets } => candidate.hit_category.intersects(*targets),
            Mask::InsideRoom => candidate.inside_room,
            Mask::Composite { layers, .. } => layers.iter().all(|l| l.mask.check(candidate)),
            Mask::Stochastic { probability, seed } => hash01(*seed, candidate.seed) < *probability,
            Mask::SpaceMap { threshold, .. } => self.raw(candidate) >= *threshold,
            Mask::Random { .. }
            | Mask::CellularNoise { .. }
            | Mask::SimplexNoise { .. }
            | Mask::Height
            | Mask::Slope
            | Mask::Cookie { .. } => true,
        }
    }
}

fn blend(op: BlendOp, candidate: &Candidate, p: Vec2, layers: &[MaskLayer<MaskRef>]) -> f32 {
    if layers.is_empty() {
        return 0.0;
    }
    let values = layers
        .iter()
        .map(|layer| layer.params.map(layer.mask.raw_at(candidate, p)));
    match op {
        BlendOp::Add => values.sum(),
        BlendOp::Avg => values.sum::<f32>() / layers.len() as f32,
        BlendOp::Mul => values.product(),
        BlendOp::Min => values.fold(f32::INFINITY, f32::min),
        BlendOp::Max => values.fold(f32::NEG_INFINITY, f32::max),
    }
}
