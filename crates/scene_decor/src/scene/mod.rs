//! Scene-side collaborators consumed by the decoration pipeline.
//!
//! The decorator never owns scene state. It reads anchor geometry and room membership
//! through [`SceneGraph`], casts rays through [`physics::RaycastBackend`] and allocates
//! instances through [`pool::InstancePool`]. Lifecycle changes arrive as [`SceneEvent`]s.
//!
//! [`memory::MemoryScene`] and [`pool::SimplePool`] are complete in-memory implementations
//! used by tests, benches and the examples crate.
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use glam::{Quat, Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod physics;
pub mod pool;

/// Stable identifier of an anchor supplied by the scene graph.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

/// Stable identifier of a room supplied by the scene graph.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// Bit-set of semantic anchor labels.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AnchorLabels(pub u32);

impl AnchorLabels {
    pub const NONE: Self = Self(0);
    pub const FLOOR: Self = Self(1 << 0);
    pub const CEILING: Self = Self(1 << 1);
    pub const WALL_FACE: Self = Self(1 << 2);
    pub const TABLE: Self = Self(1 << 3);
    pub const COUCH: Self = Self(1 << 4);
    pub const DOOR_FRAME: Self = Self(1 << 5);
    pub const WINDOW_FRAME: Self = Self(1 << 6);
    pub const STORAGE: Self = Self(1 << 7);
    pub const BED: Self = Self(1 << 8);
    pub const SCREEN: Self = Self(1 << 9);
    pub const LAMP: Self = Self(1 << 10);
    pub const PLANT: Self = Self(1 << 11);
    pub const WALL_ART: Self = Self(1 << 12);
    pub const GLOBAL_MESH: Self = Self(1 << 13);
    pub const OTHER: Self = Self(1 << 14);
    pub const ALL: Self = Self(u32::MAX);

    /// Returns `true` if any label bit is shared with `other`.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if every label bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AnchorLabels {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AnchorLabels {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Rigid world-space pose (position and orientation).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Maps a point from pose-local space into world space.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Rotates a direction from pose-local space into world space.
    #[inline]
    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Maps a world-space point into pose-local space.
    #[inline]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// Rotates a world-space direction into pose-local space.
    #[inline]
    pub fn inverse_transform_vector(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * world
    }

    /// Local +Y axis in world space.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Local +Z axis in world space (the facing direction of planar anchors).
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Decorable extent of an anchor (or of a spawned prefab acting as one).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum AnchorExtent {
    /// Rectangle of the given size in the local XY plane, centered on the origin.
    Planar(Vec2),
    /// Local-space box bounds.
    Volume { min: Vec3, max: Vec3 },
    /// No geometry; distributions treat it as a unit square.
    #[default]
    None,
}

impl AnchorExtent {
    /// XY footprint used by distributions. Volumes are projected; missing geometry is a unit square.
    pub fn footprint(&self) -> Vec2 {
        match *self {
            AnchorExtent::Planar(size) => size.abs(),
            AnchorExtent::Volume { min, max } => (max - min).truncate().abs(),
            AnchorExtent::None => Vec2::ONE,
        }
    }

    /// Center of the footprint in local XY coordinates.
    pub fn footprint_center(&self) -> Vec2 {
        match *self {
            AnchorExtent::Volume { min, max } => ((min + max) * 0.5).truncate(),
            AnchorExtent::Planar(_) | AnchorExtent::None => Vec2::ZERO,
        }
    }

    /// Local Z of the decorable face: the top of a volume, the plane itself otherwise.
    pub fn surface_z(&self) -> f32 {
        match *self {
            AnchorExtent::Volume { max, .. } => max.z,
            AnchorExtent::Planar(_) | AnchorExtent::None => 0.0,
        }
    }

    /// Returns a copy scaled component-wise by `scale`.
    pub fn scaled(&self, scale: Vec3) -> Self {
        match *self {
            AnchorExtent::Planar(size) => AnchorExtent::Planar(size * scale.truncate()),
            AnchorExtent::Volume { min, max } => AnchorExtent::Volume {
                min: min * scale,
                max: max * scale,
            },
            AnchorExtent::None => AnchorExtent::None,
        }
    }
}

/// Snapshot of an anchor's geometry as reported by the scene graph.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorGeometry {
    pub id: AnchorId,
    pub room: RoomId,
    pub labels: AnchorLabels,
    pub pose: Pose,
    pub extent: AnchorExtent,
}

/// Read access to rooms and anchors.
pub trait SceneGraph {
    /// All rooms currently loaded.
    fn rooms(&self) -> Vec<RoomId>;

    /// The room the user is in, if known.
    fn current_room(&self) -> Option<RoomId>;

    /// Anchors belonging to `room`, in a stable order.
    fn anchors(&self, room: RoomId) -> Vec<AnchorId>;

    fn anchor(&self, id: AnchorId) -> Option<AnchorGeometry>;

    /// Distance from `point` to the closest point on the anchor's surface.
    fn closest_surface_distance(&self, anchor: AnchorId, point: Vec3) -> f32;

    /// Per-axis distances from `point` to the anchor's faces, in anchor-local axes.
    /// Negative components mean the point lies between the two faces on that axis.
    fn face_distances(&self, anchor: AnchorId, point: Vec3) -> Vec3;

    fn is_inside_room(&self, room: RoomId, point: Vec3) -> bool;
}

/// Lifecycle notifications from the scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneEvent {
    SceneLoaded,
    SceneUnloaded,
    RoomCreated(RoomId),
    RoomRemoved(RoomId),
    AnchorCreated { room: RoomId, anchor: AnchorId },
    AnchorUpdated { room: RoomId, anchor: AnchorId },
    AnchorRemoved { room: RoomId, anchor: AnchorId },
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn labels_combine_and_intersect() {
        let filter = AnchorLabels::FLOOR | AnchorLabels::TABLE;
        assert!(filter.intersects(AnchorLabels::TABLE));
        assert!(!filter.intersects(AnchorLabels::WALL_FACE));
        assert!(filter.contains(AnchorLabels::FLOOR));
        assert!(AnchorLabels::NONE.is_empty());
    }

    #[test]
    fn footprint_projects_volume_and_defaults_to_unit_square() {
        let volume = AnchorExtent::Volume {
            min: Vec3::new(-1.0, -0.5, -0.8),
            max: Vec3::new(1.0, 0.5, 0.0),
        };
        assert_eq!(volume.footprint(), Vec2::new(2.0, 1.0));
        assert_eq!(volume.surface_z(), 0.0);
        assert_eq!(AnchorExtent::None.footprint(), Vec2::ONE);
        assert_eq!(AnchorExtent::Planar(Vec2::new(3.0, 2.0)).footprint(), Vec2::new(3.0, 2.0));
    }

    #[test]
    fn pose_round_trips_points() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(-FRAC_PI_2));
        let local = Vec3::new(0.5, -0.25, 1.0);
        let world = pose.transform_point(local);
        assert!((pose.inverse_transform_point(world) - local).length() < 1e-5);
        // A floor pose faces up.
        assert!((pose.forward() - Vec3::Y).length() < 1e-5);
    }
}
