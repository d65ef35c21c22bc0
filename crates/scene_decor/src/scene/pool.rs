//! Instance allocation for decoration prefabs.
use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scene::{AnchorId, Pose, RoomId};

/// Identifier of a decoration prefab.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefabId(pub String);

impl PrefabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrefabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrefabId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Handle of a live instance handed out by an [`InstancePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// Where a spawned instance is attached in the host hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    Root,
    Anchor(AnchorId),
    Room(RoomId),
    Instance(InstanceId),
}

/// World-space transform of a spawned instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl InstanceTransform {
    pub fn from_pose(pose: Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self::from_pose(Pose::IDENTITY)
    }
}

/// Pool collaborator that allocates and recycles prefab instances.
pub trait InstancePool {
    /// Reserves room for `size` instances of `prefab`. Optional for pools that grow on demand.
    fn prewarm(&mut self, _prefab: &PrefabId, _size: usize) {}

    /// Returns a ready instance placed at `pose` under `parent`, or `None` if the pool is exhausted.
    fn acquire(&mut self, prefab: &PrefabId, pose: Pose, parent: Parent) -> Option<InstanceId>;

    /// Applies the final transform after modifiers ran.
    fn set_transform(&mut self, instance: InstanceId, transform: &InstanceTransform);

    /// Returns an instance to the pool.
    fn release(&mut self, instance: InstanceId);
}

/// State of an instance currently handed out by a [`SimplePool`].
#[derive(Clone, Debug)]
pub struct LiveInstance {
    pub prefab: PrefabId,
    pub parent: Parent,
    pub transform: InstanceTransform,
}

/// Bounded in-memory pool with per-prefab free lists.
///
/// Capacities come from [`InstancePool::prewarm`]. Prefabs that were never prewarmed use
/// `default_capacity` (`None` means unbounded).
#[derive(Debug, Default)]
pub struct SimplePool {
    default_capacity: Option<usize>,
    capacity: HashMap<PrefabId, usize>,
    allocated: HashMap<PrefabId, usize>,
    free: HashMap<PrefabId, Vec<InstanceId>>,
    live: HashMap<InstanceId, LiveInstance>,
    next_id: u64,
}

impl SimplePool {
    /// Creates a pool without capacity limits for prefabs that are not prewarmed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool where every prefab defaults to `capacity` instances.
    pub fn with_default_capacity(capacity: usize) -> Self {
        Self {
            default_capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_count_of(&self, prefab: &PrefabId) -> usize {
        self.live.values().filter(|l| &l.prefab == prefab).count()
    }

    pub fn get(&self, instance: InstanceId) -> Option<&LiveInstance> {
        self.live.get(&instance)
    }

    pub fn is_live(&self, instance: InstanceId) -> bool {
        self.live.contains_key(&instance)
    }

    pub fn live(&self) -> impl Iterator<Item = (&InstanceId, &LiveInstance)> {
        self.live.iter()
    }

    fn capacity_of(&self, prefab: &PrefabId) -> Option<usize> {
        self.capacity.get(prefab).copied().or(self.default_capacity)
    }
}

impl InstancePool for SimplePool {
    fn prewarm(&mut self, prefab: &PrefabId, size: usize) {
        let entry = self.capacity.entry(prefab.clone()).or_insert(0);
        *entry = (*entry).max(size);
    }

    fn acquire(&mut self, prefab: &PrefabId, pose: Pose, parent: Parent) -> Option<InstanceId> {
        let recycled = self.free.get_mut(prefab).and_then(Vec::pop);
        let id = match recycled {
            Some(id) => id,
            None => {
                let allocated = self.allocated.get(prefab).copied().unwrap_or(0);
                if let Some(cap) = self.capacity_of(prefab) {
                    if allocated >= cap {
                        debug!("Pool for prefab '{}' exhausted at {}.", prefab, cap);
                        return None;
                    }
                }
                self.allocated.insert(prefab.clone(), allocated + 1);
                self.next_id += 1;
                InstanceId(self.next_id)
            }
        };

        self.live.insert(
            id,
            LiveInstance {
                prefab: prefab.clone(),
                parent,
                transform: InstanceTransform::from_pose(pose),
            },
        );
        Some(id)
    }

    fn set_transform(&mut self, instance: InstanceId, transform: &InstanceTransform) {
        if let Some(live) = self.live.get_mut(&instance) {
            live.transform = *transform;
        }
    }

    fn release(&mut self, instance: InstanceId) {
        if let Some(live) = self.live.remove(&instance) {
            self.free.entry(live.prefab).or_default().push(instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_respects_prewarmed_capacity() {
        let mut pool = SimplePool::new();
        let rock = PrefabId::new("rock");
        pool.prewarm(&rock, 2);

        let a = pool.acquire(&rock, Pose::IDENTITY, Parent::Root);
        let b = pool.acquire(&rock, Pose::IDENTITY, Parent::Root);
        let c = pool.acquire(&rock, Pose::IDENTITY, Parent::Root);
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(c.is_none());
        assert_eq!(pool.live_count(), 2);
    }

    #[test]
    fn release_recycles_instances() {
        let mut pool = SimplePool::with_default_capacity(1);
        let lamp = PrefabId::new("lamp");

        let first = pool.acquire(&lamp, Pose::IDENTITY, Parent::Root).unwrap();
        assert!(pool.acquire(&lamp, Pose::IDENTITY, Parent::Root).is_none());

        pool.release(first);
        assert!(!pool.is_live(first));
        let again = pool.acquire(&lamp, Pose::IDENTITY, Parent::Room(RoomId(3)));
        assert_eq!(again, Some(first));
        assert_eq!(pool.get(first).unwrap().parent, Parent::Room(RoomId(3)));
    }

    #[test]
    fn set_transform_updates_live_instance() {
        let mut pool = SimplePool::new();
        let id = pool
            .acquire(&PrefabId::new("vase"), Pose::IDENTITY, Parent::Root)
            .unwrap();
        let t = InstanceTransform {
            position: Vec3::X,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        pool.set_transform(id, &t);
        assert_eq!(pool.get(id).unwrap().transform, t);
    }
}
