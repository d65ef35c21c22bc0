//! Ray-vs-geometry queries.
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scene::pool::InstanceId;
use crate::scene::AnchorId;

/// Identifier of a solid known to the physics collaborator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u64);

/// A world-space ray. `direction` is expected to be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing `direction` (falls back to -Y for a zero vector).
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Y),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// What a ray hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    /// Scene mesh surface belonging to an anchor.
    Anchor(AnchorId),
    /// Scene mesh surface without anchor attribution.
    GlobalMesh,
    Collider(ColliderId),
    /// Decorable surface of a spawned instance.
    Instance(InstanceId),
}

/// Nearest intersection reported by a [`RaycastBackend`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance along the cast ray. The placement resolver may flip its sign.
    pub distance: f32,
    pub target: HitTarget,
}

/// Geometry set a single raycast is restricted to.
#[derive(Clone, Copy, Debug)]
pub enum TargetQuery<'a> {
    GlobalMesh,
    /// Colliders whose physics layer bit is set in the mask.
    PhysicsLayers(u32),
    Colliders(&'a [ColliderId]),
    /// Colliders carrying any of the tags.
    Tags(&'a [String]),
}

/// Physics collaborator answering ray queries.
pub trait RaycastBackend {
    /// Returns the nearest hit within `max_distance` along `ray`, restricted to `query`.
    fn raycast(&self, ray: &Ray, max_distance: f32, query: TargetQuery<'_>) -> Option<RayHit>;
}
