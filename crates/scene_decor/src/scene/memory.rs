//! In-memory scene graph and physics world.
//!
//! [`MemoryScene`] keeps rooms (axis-aligned bounds), anchors (planar rectangles or local-space
//! boxes) and box colliders tagged with a physics layer and string tags. It answers both the
//! [`SceneGraph`] and the [`RaycastBackend`] queries, treating anchor surfaces as the global mesh.
use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

use crate::scene::physics::{ColliderId, HitTarget, Ray, RayHit, RaycastBackend, TargetQuery};
use crate::scene::{
    AnchorExtent, AnchorGeometry, AnchorId, AnchorLabels, Pose, RoomId, SceneEvent, SceneGraph,
};

const PARALLEL_EPS: f32 = 1e-8;

/// Anchor definition for [`MemoryScene::add_anchor`].
#[derive(Clone, Debug)]
pub struct MemoryAnchor {
    pub id: AnchorId,
    pub labels: AnchorLabels,
    pub pose: Pose,
    pub extent: AnchorExtent,
}

impl MemoryAnchor {
    /// Planar anchor of `size` in its local XY plane.
    pub fn plane(id: u64, labels: AnchorLabels, pose: Pose, size: Vec2) -> Self {
        Self {
            id: AnchorId(id),
            labels,
            pose,
            extent: AnchorExtent::Planar(size),
        }
    }

    /// Volume anchor bounded by `min`/`max` in local space.
    pub fn volume(id: u64, labels: AnchorLabels, pose: Pose, min: Vec3, max: Vec3) -> Self {
        Self {
            id: AnchorId(id),
            labels,
            pose,
            extent: AnchorExtent::Volume { min, max },
        }
    }
}

/// Oriented box collider.
#[derive(Clone, Debug)]
pub struct MemoryCollider {
    pub id: ColliderId,
    pub pose: Pose,
    pub half_extents: Vec3,
    /// Physics layer index in `0..32`.
    pub layer: u32,
    pub tags: Vec<String>,
}

impl MemoryCollider {
    pub fn new(id: u64, pose: Pose, half_extents: Vec3) -> Self {
        Self {
            id: ColliderId(id),
            pose,
            half_extents,
            layer: 0,
            tags: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    fn in_layers(&self, mask: u32) -> bool {
        self.layer < 32 && mask & (1 << self.layer) != 0
    }
}

#[derive(Clone, Debug)]
struct MemoryRoom {
    min: Vec3,
    max: Vec3,
    anchors: Vec<AnchorId>,
}

/// In-memory scene implementing [`SceneGraph`] and [`RaycastBackend`].
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    rooms: BTreeMap<RoomId, MemoryRoom>,
    anchors: BTreeMap<AnchorId, AnchorGeometry>,
    colliders: Vec<MemoryCollider>,
    current_room: Option<RoomId>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a room with world-space bounds. The first room becomes the current room.
    pub fn add_room(&mut self, id: u64, min: Vec3, max: Vec3) -> SceneEvent {
        let id = RoomId(id);
        self.rooms.insert(
            id,
            MemoryRoom {
                min: min.min(max),
                max: min.max(max),
                anchors: Vec::new(),
            },
        );
        if self.current_room.is_none() {
            self.current_room = Some(id);
        }
        SceneEvent::RoomCreated(id)
    }

    pub fn set_current_room(&mut self, room: Option<RoomId>) {
        self.current_room = room;
    }

    /// Adds an anchor to `room`. Returns `None` if the room is unknown.
    pub fn add_anchor(&mut self, room: RoomId, anchor: MemoryAnchor) -> Option<SceneEvent> {
        let entry = self.rooms.get_mut(&room)?;
        if !entry.anchors.contains(&anchor.id) {
            entry.anchors.push(anchor.id);
        }
        self.anchors.insert(
            anchor.id,
            AnchorGeometry {
                id: anchor.id,
                room,
                labels: anchor.labels,
                pose: anchor.pose,
                extent: anchor.extent,
            },
        );
        Some(SceneEvent::AnchorCreated {
            room,
            anchor: anchor.id,
        })
    }

    /// Replaces an anchor's pose and extent.
    pub fn update_anchor(
        &mut self,
        id: AnchorId,
        pose: Pose,
        extent: AnchorExtent,
    ) -> Option<SceneEvent> {
        let geometry = self.anchors.get_mut(&id)?;
        geometry.pose = pose;
        geometry.extent = extent;
        Some(SceneEvent::AnchorUpdated {
            room: geometry.room,
            anchor: id,
        })
    }

    pub fn remove_anchor(&mut self, id: AnchorId) -> Option<SceneEvent> {
        let geometry = self.anchors.remove(&id)?;
        if let Some(room) = self.rooms.get_mut(&geometry.room) {
            room.anchors.retain(|a| *a != id);
        }
        Some(SceneEvent::AnchorRemoved {
            room: geometry.room,
            anchor: id,
        })
    }

    /// Removes a room and all of its anchors.
    pub fn remove_room(&mut self, id: RoomId) -> Option<SceneEvent> {
        let room = self.rooms.remove(&id)?;
        for anchor in room.anchors {
            self.anchors.remove(&anchor);
        }
        if self.current_room == Some(id) {
            self.current_room = self.rooms.keys().next().copied();
        }
        Some(SceneEvent::RoomRemoved(id))
    }

    pub fn add_collider(&mut self, collider: MemoryCollider) {
        self.colliders.push(collider);
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    fn raycast_anchors(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for geometry in self.anchors.values() {
            let hit = match geometry.extent {
                AnchorExtent::Planar(size) => intersect_rect(&geometry.pose, size, ray),
                AnchorExtent::Volume { min, max } => {
                    intersect_box(&geometry.pose, min, max, ray)
                }
                AnchorExtent::None => None,
            };
            if let Some((distance, normal)) = hit {
                keep_nearest(
                    &mut best,
                    ray,
                    distance,
                    normal,
                    max_distance,
                    HitTarget::Anchor(geometry.id),
                );
            }
        }
        best
    }

    fn raycast_colliders<'a>(
        &self,
        ray: &Ray,
        max_distance: f32,
        colliders: impl Iterator<Item = &'a MemoryCollider>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for collider in colliders {
            let hit = intersect_box(
                &collider.pose,
                -collider.half_extents,
                collider.half_extents,
                ray,
            );
            if let Some((distance, normal)) = hit {
                keep_nearest(
                    &mut best,
                    ray,
                    distance,
                    normal,
                    max_distance,
                    HitTarget::Collider(collider.id),
                );
            }
        }
        best
    }
}

fn keep_nearest(
    best: &mut Option<RayHit>,
    ray: &Ray,
    distance: f32,
    normal: Vec3,
    max_distance: f32,
    target: HitTarget,
) {
    if distance < 0.0 || distance > max_distance {
        return;
    }
    if best.is_some_and(|b| b.distance <= distance) {
        return;
    }
    *best = Some(RayHit {
        point: ray.at(distance),
        normal,
        distance,
        target,
    });
}

/// Two-sided ray/rectangle test in the pose's XY plane. Returns distance and world normal
/// facing against the ray.
fn intersect_rect(pose: &Pose, size: Vec2, ray: &Ray) -> Option<(f32, Vec3)> {
    let o = pose.inverse_transform_point(ray.origin);
    let d = pose.inverse_transform_vector(ray.direction);
    if d.z.abs() < PARALLEL_EPS {
        return None;
    }
    let t = -o.z / d.z;
    if t < 0.0 {
        return None;
    }
    let p = o + d * t;
    let half = size.abs() * 0.5;
    if p.x.abs() > half.x || p.y.abs() > half.y {
        return None;
    }
    let normal = if d.z > 0.0 { Vec3::NEG_Z } else { Vec3::Z };
    Some((t, pose.transform_vector(normal)))
}

/// Slab test against a local-space box. Rays starting inside report the exit face.
fn intersect_box(pose: &Pose, min: Vec3, max: Vec3, ray: &Ray) -> Option<(f32, Vec3)> {
    let o = pose.inverse_transform_point(ray.origin);
    let d = pose.inverse_transform_vector(ray.direction);

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec3::ZERO;
    let mut exit_normal = Vec3::ZERO;

    for axis in 0..3 {
        let (o_a, d_a, lo, hi) = (o[axis], d[axis], min[axis], max[axis]);
        if d_a.abs() < PARALLEL_EPS {
            if o_a < lo || o_a > hi {
                return None;
            }
            continue;
        }
        let mut unit = Vec3::ZERO;
        unit[axis] = 1.0;
        let t1 = (lo - o_a) / d_a;
        let t2 = (hi - o_a) / d_a;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if near > t_enter {
            t_enter = near;
            enter_normal = -unit * d_a.signum();
        }
        if far < t_exit {
            t_exit = far;
            exit_normal = unit * d_a.signum();
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if t_enter >= 0.0 {
        Some((t_enter, pose.transform_vector(enter_normal)))
    } else if t_exit >= 0.0 {
        Some((t_exit, pose.transform_vector(exit_normal)))
    } else {
        None
    }
}

impl SceneGraph for MemoryScene {
    fn rooms(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    fn current_room(&self) -> Option<RoomId> {
        self.current_room
    }

    fn anchors(&self, room: RoomId) -> Vec<AnchorId> {
        self.rooms
            .get(&room)
            .map(|r| r.anchors.clone())
            .unwrap_or_default()
    }

    fn anchor(&self, id: AnchorId) -> Option<AnchorGeometry> {
        self.anchors.get(&id).cloned()
    }

    fn closest_surface_distance(&self, anchor: AnchorId, point: Vec3) -> f32 {
        let Some(geometry) = self.anchors.get(&anchor) else {
            return f32::INFINITY;
        };
        let p = geometry.pose.inverse_transform_point(point);
        match geometry.extent {
            AnchorExtent::Planar(size) => {
                let half = size.abs() * 0.5;
                let closest =
                    Vec3::new(p.x.clamp(-half.x, half.x), p.y.clamp(-half.y, half.y), 0.0);
                (p - closest).length()
            }
            AnchorExtent::Volume { min, max } => {
                let clamped = p.clamp(min, max);
                if clamped != p {
                    (p - clamped).length()
                } else {
                    (p - min).min(max - p).min_element()
                }
            }
            AnchorExtent::None => p.length(),
        }
    }

    fn face_distances(&self, anchor: AnchorId, point: Vec3) -> Vec3 {
        let Some(geometry) = self.anchors.get(&anchor) else {
            return Vec3::splat(f32::INFINITY);
        };
        let p = geometry.pose.inverse_transform_point(point);
        match geometry.extent {
            AnchorExtent::Planar(size) => {
                let half = size.abs() * 0.5;
                Vec3::new(p.x.abs() - half.x, p.y.abs() - half.y, p.z.abs())
            }
            AnchorExtent::Volume { min, max } => {
                let center = (min + max) * 0.5;
                let half = (max - min).abs() * 0.5;
                (p - center).abs() - half
            }
            AnchorExtent::None => p.abs(),
        }
    }

    fn is_inside_room(&self, room: RoomId, point: Vec3) -> bool {
        self.rooms
            .get(&room)
            .is_some_and(|r| point.cmpge(r.min).all() && point.cmple(r.max).all())
    }
}

impl RaycastBackend for MemoryScene {
    fn raycast(&self, ray: &Ray, max_distance: f32, query: TargetQuery<'_>) -> Option<RayHit> {
        match query {
            TargetQuery::GlobalMesh => self.raycast_anchors(ray, max_distance),
            TargetQuery::PhysicsLayers(mask) => self.raycast_colliders(
                ray,
                max_distance,
                self.colliders.iter().filter(|c| c.in_layers(mask)),
            ),
            TargetQuery::Colliders(ids) => self.raycast_colliders(
                ray,
                max_distance,
                self.colliders.iter().filter(|c| ids.contains(&c.id)),
            ),
            TargetQuery::Tags(tags) => self.raycast_colliders(
                ray,
                max_distance,
                self.colliders
                    .iter()
                    .filter(|c| c.tags.iter().any(|t| tags.contains(t))),
            ),
        }
    }
}
