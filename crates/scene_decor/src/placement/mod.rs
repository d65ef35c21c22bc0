//! Placement resolver: turns a 2D sample point into a surface hit.
//!
//! For each sample the resolver builds a world-space ray according to the [`PlacementMode`],
//! queries every enabled target category through the [`RaycastBackend`], keeps the globally
//! nearest hit (by absolute distance) and assembles a [`Candidate`] with the geometric quantities
//! masks need. A sample without any hit produces no candidate; that is not an error.
use std::f32::consts::{PI, TAU};
use std::ops::{BitOr, BitOrAssign};

use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::SamplePoint;
use crate::error::{Error, Result};
use crate::placement::candidate::Candidate;
use crate::scene::physics::{ColliderId, HitTarget, Ray, RayHit, RaycastBackend, TargetQuery};
use crate::scene::pool::{InstanceId, PrefabId};
use crate::scene::{AnchorExtent, AnchorGeometry, AnchorId, Pose, RoomId, SceneGraph};

pub mod candidate;

/// Bit-set of geometry categories a rule casts against.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Targets(pub u8);

impl Targets {
    pub const NONE: Self = Self(0);
    pub const GLOBAL_MESH: Self = Self(1 << 0);
    pub const PHYSICS_LAYERS: Self = Self(1 << 1);
    pub const CUSTOM_COLLIDERS: Self = Self(1 << 2);
    pub const CUSTOM_TAGS: Self = Self(1 << 3);
    pub const ALL: Self = Self(0b1111);

    /// Categories in query order.
    pub const CATEGORIES: [Self; 4] = [
        Self::GLOBAL_MESH,
        Self::PHYSICS_LAYERS,
        Self::CUSTOM_COLLIDERS,
        Self::CUSTOM_TAGS,
    ];

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Targets {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Targets {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// How the cast ray is derived from a sample point.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlacementMode {
    /// Origin on the anchor face, direction in anchor-local space.
    #[default]
    LocalPlanar,
    /// Origin on the anchor face, direction in world space.
    WorldPlanar,
    /// Radial cast from the anchor origin; the normalized sample is `(azimuth, polar)`.
    Spherical,
}

/// Ray parameters of a rule.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaySettings {
    /// Cast direction (anchor-local for `LocalPlanar`, world for `WorldPlanar`).
    pub direction: Vec3,
    /// Origin offset in anchor-local space.
    pub offset: Vec3,
    /// Casts the opposite way so hits behind the origin win.
    pub select_behind: bool,
    pub max_distance: f32,
}

impl Default for RaySettings {
    fn default() -> Self {
        Self {
            direction: Vec3::NEG_Z,
            offset: Vec3::new(0.0, 0.0, 0.25),
            select_behind: false,
            max_distance: 2.0,
        }
    }
}

impl RaySettings {
    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_select_behind(mut self, select_behind: bool) -> Self {
        self.select_behind = select_behind;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }
}

/// Target categories and their per-category filters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSettings {
    pub targets: Targets,
    pub physics_layers: u32,
    pub colliders: Vec<ColliderId>,
    pub tags: Vec<String>,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            targets: Targets::GLOBAL_MESH,
            physics_layers: 0,
            colliders: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl TargetSettings {
    pub fn global_mesh() -> Self {
        Self::default()
    }

    pub fn with_physics_layers(mut self, layers: u32) -> Self {
        self.targets |= Targets::PHYSICS_LAYERS;
        self.physics_layers = layers;
        self
    }

    pub fn with_colliders(mut self, colliders: impl IntoIterator<Item = ColliderId>) -> Self {
        self.targets |= Targets::CUSTOM_COLLIDERS;
        self.colliders = colliders.into_iter().collect();
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.targets |= Targets::CUSTOM_TAGS;
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Query for one enabled category.
    fn query(&self, category: Targets) -> TargetQuery<'_> {
        match category {
            Targets::PHYSICS_LAYERS => TargetQuery::PhysicsLayers(self.physics_layers),
            Targets::CUSTOM_COLLIDERS => TargetQuery::Colliders(&self.colliders),
            Targets::CUSTOM_TAGS => TargetQuery::Tags(&self.tags),
            _ => TargetQuery::GlobalMesh,
        }
    }
}

/// Placement block of a rule.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementSettings {
    pub mode: PlacementMode,
    pub ray: RaySettings,
    pub targets: TargetSettings,
}

impl PlacementSettings {
    pub fn validate(&self) -> Result<()> {
        if self.targets.targets.is_empty() {
            return Err(Error::InvalidConfig("no target categories enabled".into()));
        }
        if !(self.ray.max_distance.is_finite() && self.ray.max_distance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "ray max_distance must be positive and finite, got {}",
                self.ray.max_distance
            )));
        }
        if self.mode != PlacementMode::Spherical && self.ray.direction.length_squared() == 0.0 {
            return Err(Error::InvalidConfig("ray direction must be non-zero".into()));
        }
        Ok(())
    }
}

/// Surface being decorated: an anchor, or a spawned instance standing in for one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementSite {
    /// Anchor used for distance queries and ownership.
    pub anchor: AnchorId,
    pub room: RoomId,
    pub pose: Pose,
    pub extent: AnchorExtent,
    /// Spawned instance whose footprint is decorated. Its top face counts as scene mesh.
    pub host: Option<InstanceId>,
}

impl PlacementSite {
    pub fn from_anchor(anchor: &AnchorGeometry) -> Self {
        Self {
            anchor: anchor.id,
            room: anchor.room,
            pose: anchor.pose,
            extent: anchor.extent,
            host: None,
        }
    }

    /// Intersects `ray` with the host footprint, if the site has a host.
    fn host_hit(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        let host = self.host?;
        let origin = self.pose.inverse_transform_point(ray.origin);
        let direction = self.pose.inverse_transform_vector(ray.direction);
        if direction.z.abs() <= f32::EPSILON {
            return None;
        }
        let t = (self.extent.surface_z() - origin.z) / direction.z;
        if !(0.0..=max_distance).contains(&t) {
            return None;
        }
        let local = origin + direction * t;
        let offset = local.truncate() - self.extent.footprint_center();
        let half = self.extent.footprint() * 0.5;
        if offset.x.abs() > half.x || offset.y.abs() > half.y {
            return None;
        }
        let normal = self.pose.forward();
        Some(RayHit {
            point: ray.at(t),
            normal: if normal.dot(ray.direction) > 0.0 { -normal } else { normal },
            distance: t,
            target: HitTarget::Instance(host),
        })
    }
}

/// A hit tagged with the category that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CategorizedHit {
    pub hit: RayHit,
    pub category: Targets,
}

/// Picks the hit with the smallest absolute distance.
///
/// Distances are signed along the configured ray direction. With `select_behind` the sign is
/// flipped so a hit behind the origin reports a positive distance.
pub fn select_nearest(
    hits: impl IntoIterator<Item = CategorizedHit>,
    select_behind: bool,
) -> Option<CategorizedHit> {
    hits.into_iter()
        .map(|mut h| {
            if select_behind {
                h.hit.distance = -h.hit.distance;
            }
            h
        })
        .filter(|h| h.hit.distance.is_finite())
        .min_by(|a, b| a.hit.distance.abs().total_cmp(&b.hit.distance.abs()))
}

/// Angle in degrees between `normal` and the reversed cast `direction`, taken as `atan2` of
/// the cross and dot products so it stays precise near 0° and 180°.
pub fn slope_degrees(normal: Vec3, direction: Vec3) -> f32 {
    let back = -direction;
    normal
        .cross(back)
        .length()
        .atan2(normal.dot(back))
        .to_degrees()
}

/// World-space ray for `point` on `site`.
pub fn cast_ray(site: &PlacementSite, point: &SamplePoint, settings: &PlacementSettings) -> Ray {
    let ray = &settings.ray;
    let (origin, direction) = match settings.mode {
        PlacementMode::LocalPlanar | PlacementMode::WorldPlanar => {
            let center = site.extent.footprint_center();
            let lifted = Vec3::new(
                point.local.x + center.x,
                point.local.y + center.y,
                site.extent.surface_z(),
            );
            let origin = site.pose.transform_point(lifted + ray.offset);
            let direction = if settings.mode == PlacementMode::LocalPlanar {
                site.pose.transform_vector(ray.direction)
            } else {
                ray.direction
            };
            (origin, direction)
        }
        PlacementMode::Spherical => {
            let azimuth = point.normalized.x * TAU;
            let polar = point.normalized.y * PI;
            let direction = Vec3::new(
                polar.sin() * azimuth.cos(),
                polar.cos(),
                polar.sin() * azimuth.sin(),
            );
            (site.pose.transform_point(ray.offset), direction)
        }
    };
    let direction = if ray.select_behind { -direction } else { direction };
    Ray::new(origin, direction)
}

/// Resolves one sample point into a [`Candidate`], or `None` when nothing was hit.
pub fn resolve_placement(
    scene: &dyn SceneGraph,
    physics: &dyn RaycastBackend,
    settings: &PlacementSettings,
    site: &PlacementSite,
    point: &SamplePoint,
    prefab: PrefabId,
    seed: u64,
) -> Option<Candidate> {
    let ray = cast_ray(site, point, settings);
    let sign = if settings.ray.select_behind { -1.0 } else { 1.0 };

    let hits = Targets::CATEGORIES
        .into_iter()
        .filter(|c| settings.targets.targets.intersects(*c))
        .flat_map(|category| {
            let host = if category == Targets::GLOBAL_MESH {
                site.host_hit(&ray, settings.ray.max_distance)
            } else {
                None
            };
            let scene_hit = physics.raycast(
                &ray,
                settings.ray.max_distance,
                settings.targets.query(category),
            );
            host.into_iter().chain(scene_hit).map(move |mut hit| {
                // Report distances along the configured direction.
                hit.distance *= sign;
                CategorizedHit { hit, category }
            })
        });
    let nearest = select_nearest(hits, settings.ray.select_behind)?;

    let hit = nearest.hit;

    Some(Candidate {
        prefab,
        anchor: site.anchor,
        room: site.room,
        seed,
        local_pos: point.local,
        local_pos_normalized: point.normalized,
        hit,
        hit_category: nearest.category,
        cast_direction: ray.direction,
        anchor_dist: scene.closest_surface_distance(site.anchor, hit.point),
        anchor_comp_dists: scene.face_distances(site.anchor, hit.point),
        slope: slope_degrees(hit.normal, ray.direction),
        inside_room: scene.is_inside_room(site.room, hit.point),
    })
}
