//! Bookkeeping of spawned instances.
//!
//! Every instance the decorator keeps is recorded here together with the top-level anchor it
//! belongs to, so anchor, room and scene events can release exactly what they own.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::decor::rule::RuleId;
use crate::scene::pool::{InstanceId, InstanceTransform, Parent, PrefabId};
use crate::scene::{AnchorId, RoomId};

/// What the decorator knows about one spawned instance.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnedInstanceRecord {
    pub instance: InstanceId,
    pub prefab: PrefabId,
    /// Top-level anchor owning the instance, also for nested decorations.
    pub anchor: AnchorId,
    pub room: RoomId,
    /// Rule of the top-level decoration that produced the instance.
    pub rule: RuleId,
    pub depth: u32,
    /// Instance whose footprint the nested decoration ran on.
    pub host: Option<InstanceId>,
    pub parent: Parent,
    /// Decorator clock value at which the instance is released.
    pub expires_at: Option<f64>,
    pub persistent: bool,
    pub transform: InstanceTransform,
}

/// Instance records keyed by id and grouped by owning anchor.
#[derive(Clone, Debug, Default)]
pub struct InstanceIndex {
    records: HashMap<InstanceId, SpawnedInstanceRecord>,
    by_anchor: BTreeMap<AnchorId, Vec<InstanceId>>,
}

impl InstanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a record. Returns `false` (and keeps the existing record) if the id is known.
    pub fn insert(&mut self, record: SpawnedInstanceRecord) -> bool {
        if self.records.contains_key(&record.instance) {
            return false;
        }
        self.by_anchor
            .entry(record.anchor)
            .or_default()
            .push(record.instance);
        self.records.insert(record.instance, record);
        true
    }

    pub fn remove(&mut self, instance: InstanceId) -> Option<SpawnedInstanceRecord> {
        let record = self.records.remove(&instance)?;
        if let Some(ids) = self.by_anchor.get_mut(&record.anchor) {
            ids.retain(|&id| id != instance);
            if ids.is_empty() {
                self.by_anchor.remove(&record.anchor);
            }
        }
        Some(record)
    }

    pub fn get(&self, instance: InstanceId) -> Option<&SpawnedInstanceRecord> {
        self.records.get(&instance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnedInstanceRecord> {
        self.records.values()
    }

    /// Instances owned by `anchor`, in spawn order.
    pub fn instances_for_anchor(&self, anchor: AnchorId) -> &[InstanceId] {
        self.by_anchor.get(&anchor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `rule` has live instances on `anchor`.
    pub fn has(&self, rule: &str, anchor: AnchorId) -> bool {
        self.instances_for_anchor(anchor)
            .iter()
            .filter_map(|id| self.records.get(id))
            .any(|r| r.rule == rule)
    }

    /// Removes and returns all records matching `filter`, in anchor then spawn order.
    pub fn take_where(
        &mut self,
        mut filter: impl FnMut(&SpawnedInstanceRecord) -> bool,
    ) -> Vec<SpawnedInstanceRecord> {
        let Self { records, by_anchor } = self;
        let mut taken = Vec::new();
        by_anchor.retain(|_, ids| {
            drain_matching(records, ids, &mut filter, &mut taken);
            !ids.is_empty()
        });
        taken
    }

    /// Removes the records of `anchor` produced by `rule`, or by every rule when `None`.
    pub fn take_anchor(
        &mut self,
        anchor: AnchorId,
        rule: Option<&str>,
    ) -> Vec<SpawnedInstanceRecord> {
        let Self { records, by_anchor } = self;
        let mut taken = Vec::new();
        if let Some(ids) = by_anchor.get_mut(&anchor) {
            let mut filter = |r: &SpawnedInstanceRecord| rule.is_none_or(|id| r.rule == id);
            drain_matching(records, ids, &mut filter, &mut taken);
            if ids.is_empty() {
                by_anchor.remove(&anchor);
            }
        }
        taken
    }

    /// Removes the records nested (at any depth) under one of `hosts`, shallowest first.
    pub fn take_descendants(
        &mut self,
        hosts: impl IntoIterator<Item = InstanceId>,
    ) -> Vec<SpawnedInstanceRecord> {
        let mut frontier: HashSet<InstanceId> = hosts.into_iter().collect();
        let mut taken = Vec::new();
        while !frontier.is_empty() {
            let level = self.take_where(|r| r.host.is_some_and(|h| frontier.contains(&h)));
            frontier = level.iter().map(|r| r.instance).collect();
            taken.extend(level);
        }
        taken
    }

    pub fn take_room(&mut self, room: RoomId, rule: Option<&str>) -> Vec<SpawnedInstanceRecord> {
        self.take_where(|r| r.room == room && rule.is_none_or(|id| r.rule == id))
    }

    /// Removes records whose lifetime ended at or before `now`.
    pub fn take_expired(&mut self, now: f64) -> Vec<SpawnedInstanceRecord> {
        self.take_where(|r| r.expires_at.is_some_and(|t| t <= now))
    }

    /// Removes everything, keeping persistent records unless `include_persistent` is set.
    pub fn take_all(&mut self, include_persistent: bool) -> Vec<SpawnedInstanceRecord> {
        self.take_where(|r| include_persistent || !r.persistent)
    }
}

/// Moves the records of `ids` accepted by `filter` into `taken`, keeping the order of `ids`.
fn drain_matching(
    records: &mut HashMap<InstanceId, SpawnedInstanceRecord>,
    ids: &mut Vec<InstanceId>,
    filter: &mut impl FnMut(&SpawnedInstanceRecord) -> bool,
    taken: &mut Vec<SpawnedInstanceRecord>,
) {
    ids.retain(|id| {
        if !records.get(id).is_some_and(&mut *filter) {
            return true;
        }
        taken.extend(records.remove(id));
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(instance: u64, anchor: u64, room: u64, rule: &str) -> SpawnedInstanceRecord {
        SpawnedInstanceRecord {
            instance: InstanceId(instance),
            prefab: PrefabId::new("p"),
            anchor: AnchorId(anchor),
            room: RoomId(room),
            rule: rule.into(),
            depth: 0,
            host: None,
            parent: Parent::Anchor(AnchorId(anchor)),
            expires_at: None,
            persistent: false,
            transform: InstanceTransform::default(),
        }
    }

    #[test]
    fn insert_rejects_duplicates_and_groups_by_anchor() {
        let mut index = InstanceIndex::new();
        assert!(index.insert(record(1, 10, 1, "a")));
        assert!(index.insert(record(2, 10, 1, "b")));
        assert!(!index.insert(record(1, 11, 1, "a")));
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.instances_for_anchor(AnchorId(10)),
            &[InstanceId(1), InstanceId(2)]
        );
        assert!(index.has("b", AnchorId(10)));
        assert!(!index.has("b", AnchorId(11)));
    }

    #[test]
    fn take_anchor_filters_by_rule() {
        let mut index = InstanceIndex::new();
        index.insert(record(1, 10, 1, "a"));
        index.insert(record(2, 10, 1, "b"));
        let taken = index.take_anchor(AnchorId(10), Some("a"));
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].instance, InstanceId(1));
        assert_eq!(index.instances_for_anchor(AnchorId(10)), &[InstanceId(2)]);
        assert_eq!(index.take_anchor(AnchorId(10), None).len(), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn take_room_leaves_other_rooms() {
        let mut index = InstanceIndex::new();
        index.insert(record(1, 10, 1, "a"));
        index.insert(record(2, 20, 2, "a"));
        let taken = index.take_room(RoomId(1), None);
        assert_eq!(taken.len(), 1);
        assert!(index.get(InstanceId(2)).is_some());
    }

    #[test]
    fn expiry_and_persistence() {
        let mut index = InstanceIndex::new();
        let mut short = record(1, 10, 1, "a");
        short.expires_at = Some(1.0);
        let mut kept = record(2, 10, 1, "a");
        kept.persistent = true;
        index.insert(short);
        index.insert(kept);
        index.insert(record(3, 10, 1, "a"));

        assert!(index.take_expired(0.5).is_empty());
        assert_eq!(index.take_expired(1.0).len(), 1);
        let cleared = index.take_all(false);
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].instance, InstanceId(3));
        assert_eq!(index.take_all(true).len(), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn bulk_takes_keep_spawn_order_and_drop_empty_anchors() {
        let mut index = InstanceIndex::new();
        for i in 0..2_000 {
            index.insert(record(i, 10 + i % 2, 1, if i % 4 == 0 { "a" } else { "b" }));
        }
        let taken = index.take_anchor(AnchorId(10), Some("a"));
        assert_eq!(taken.len(), 500);
        assert!(taken.windows(2).all(|w| w[0].instance.0 < w[1].instance.0));
        assert_eq!(index.instances_for_anchor(AnchorId(10)).len(), 500);

        let rest = index.take_all(false);
        assert_eq!(rest.len(), 1_500);
        assert!(rest[..500].iter().all(|r| r.anchor == AnchorId(10)));
        assert!(index.is_empty());
        assert!(index.instances_for_anchor(AnchorId(11)).is_empty());
    }

    #[test]
    fn descendants_follow_the_host_chain() {
        let mut index = InstanceIndex::new();
        index.insert(record(1, 10, 1, "tables"));
        let mut cup = record(2, 10, 1, "tables");
        cup.host = Some(InstanceId(1));
        let mut spoon = record(3, 10, 1, "tables");
        spoon.host = Some(InstanceId(2));
        let mut other = record(4, 10, 1, "tables");
        other.host = Some(InstanceId(9));
        for r in [cup, spoon, other] {
            index.insert(r);
        }

        let root = index.remove(InstanceId(1)).unwrap();
        let nested = index.take_descendants([root.instance]);
        let ids: Vec<u64> = nested.iter().map(|r| r.instance.0).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(index.len(), 1);
        assert!(index.take_descendants([InstanceId(5)]).is_empty());
    }
}
