//! Per-sample evaluation record.
use glam::{Vec2, Vec3};

use crate::placement::Targets;
use crate::scene::physics::RayHit;
use crate::scene::pool::PrefabId;
use crate::scene::{AnchorId, RoomId};

/// One evaluated sample point together with its resolved surface hit.
///
/// Candidates live for a single placement decision. Masks, constraints and modifiers read from
/// them; nothing writes back.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Prefab chosen for this point.
    pub prefab: PrefabId,
    pub anchor: AnchorId,
    pub room: RoomId,
    /// Seed for per-candidate randomness (random and stochastic masks).
    pub seed: u64,
    pub local_pos: Vec2,
    /// Local position normalized to `[0, 1]` across the footprint.
    pub local_pos_normalized: Vec2,
    /// Nearest hit; `distance` is positive along the actual cast direction.
    pub hit: RayHit,
    pub hit_category: Targets,
    pub cast_direction: Vec3,
    /// Distance from the hit point to the owning anchor's surface.
    pub anchor_dist: f32,
    /// Per-axis face distances in anchor-local axes, negative inside the anchor's span.
    pub anchor_comp_dists: Vec3,
    /// Degrees between the hit normal and the reversed cast direction.
    pub slope: f32,
    pub inside_room: bool,
}

#[cfg(test)]
impl Candidate {
    /// Floor-like candidate at `local` with an upward hit straight below the origin.
    pub(crate) fn test_at(local: Vec2) -> Self {
        use crate::scene::physics::HitTarget;

        Self {
            prefab: PrefabId::new("test"),
            anchor: AnchorId(1),
            room: RoomId(1),
            seed: 0,
            local_pos: local,
            local_pos_normalized: local + Vec2::splat(0.5),
            hit: RayHit {
                point: Vec3::new(local.x, 0.0, -local.y),
                normal: Vec3::Y,
                distance: 0.25,
                target: HitTarget::Anchor(AnchorId(1)),
            },
            hit_category: Targets::GLOBAL_MESH,
            cast_direction: Vec3::NEG_Y,
            anchor_dist: 0.0,
            anchor_comp_dists: Vec3::new(-0.5, -0.5, 0.0),
            slope: 0.0,
            inside_room: true,
        }
    }
}
