//! Event-driven decoration orchestrator.
//!
//! [`Decorator`] owns the per-rule state machine and the [`InstanceIndex`]. Scene lifecycle
//! events are queued with [`Decorator::enqueue`] and drained in FIFO order by
//! [`Decorator::process_events`]; hosts can also call the entry points directly
//! ([`Decorator::decorate_rule`], [`Decorator::decorate_anchor`], the `clear_*` family and
//! [`Decorator::tick`]).
//!
//! Decorating one anchor runs a worklist of placement sites. The first site is the anchor
//! itself; every spawned instance whose prefab lists nested decorators adds one site per nested
//! rule, one level deeper, until the nested rule's recursion limit stops it. All collaborators
//! are passed per call through a [`DecorContext`].
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::decor::constraint::first_failure;
use crate::decor::events::{DecorEvent, DecorEventKind, EventSink, ReleaseReason};
use crate::decor::index::{InstanceIndex, SpawnedInstanceRecord};
use crate::decor::modifier::SpawnedInstance;
use crate::decor::rule::{CompiledRule, CompiledRules, DecorateOnStart, SpawnHierarchy};
use crate::decor::seed::{derive_seed, hash01, seed_for_anchor};
use crate::decor::selection::pick_weighted;
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::mask::texture::TextureRegistry;
use crate::placement::{resolve_placement, PlacementSite};
use crate::scene::physics::RaycastBackend;
use crate::scene::pool::{InstanceId, InstancePool, InstanceTransform, Parent};
use crate::scene::{
    AnchorExtent, AnchorGeometry, AnchorId, Pose, RoomId, SceneEvent, SceneGraph,
};

/// Salt separating the prefab roll from other per-point randomness.
const PREFAB_SALT: u64 = 0x5052_4546_4142;

/// Scale magnitude treated as zero by `discard_zero_scale`.
const ZERO_SCALE_EPS: f32 = 1e-4;

/// Global decorator settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoratorConfig {
    /// Mixed into every rule seed.
    pub base_seed: u64,
    /// Upper bound on sample points evaluated per placement site.
    pub max_points_per_anchor: usize,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            base_seed: 0,
            max_points_per_anchor: 4096,
        }
    }
}

impl DecoratorConfig {
    pub fn new(base_seed: u64) -> Self {
        Self {
            base_seed,
            ..Self::default()
        }
    }

    pub fn with_max_points_per_anchor(mut self, max_points: usize) -> Self {
        self.max_points_per_anchor = max_points;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_points_per_anchor == 0 {
            return Err(Error::InvalidConfig(
                "max_points_per_anchor must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle state of a rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleState {
    /// Waiting for a scene-loaded or room-created event.
    #[default]
    Idle,
    /// Decorated on start; ignores anchor events.
    Active,
    /// Decorated on start and follows anchor created/updated/removed events.
    Tracking,
    /// Ignores all events. Spawned instances are left alone.
    Disabled,
}

/// Counters for one decoration call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecorationReport {
    /// Top-level anchors decorated.
    pub anchors: usize,
    /// Placement sites processed, nested ones included.
    pub sites: usize,
    pub points: usize,
    pub hits: usize,
    pub misses: usize,
    /// Candidates rejected by a constraint.
    pub rejected: usize,
    pub spawned: usize,
    pub pool_misses: usize,
    /// Instances released for having a zero scale axis.
    pub discarded: usize,
    /// Nested sites skipped by a recursion limit.
    pub recursion_stops: usize,
    pub released: usize,
}

impl AddAssign for DecorationReport {
    fn add_assign(&mut self, rhs: Self) {
        self.anchors += rhs.anchors;
        self.sites += rhs.sites;
        self.points += rhs.points;
        self.hits += rhs.hits;
        self.misses += rhs.misses;
        self.rejected += rhs.rejected;
        self.spawned += rhs.spawned;
        self.pool_misses += rhs.pool_misses;
        self.discarded += rhs.discarded;
        self.recursion_stops += rhs.recursion_stops;
        self.released += rhs.released;
    }
}

impl Add for DecorationReport {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Collaborators for one orchestrator call.
pub struct DecorContext<'a> {
    pub scene: &'a dyn SceneGraph,
    pub physics: &'a dyn RaycastBackend,
    pub pool: &'a mut dyn InstancePool,
    pub textures: &'a TextureRegistry,
    sink: Option<&'a mut dyn EventSink>,
}

impl<'a> DecorContext<'a> {
    pub fn new(
        scene: &'a dyn SceneGraph,
        physics: &'a dyn RaycastBackend,
        pool: &'a mut dyn InstancePool,
        textures: &'a TextureRegistry,
    ) -> Self {
        Self {
            scene,
            physics,
            pool,
            textures,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: &'a mut dyn EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds and sends the event only if the sink wants its kind.
    fn emit(&mut self, kind: DecorEventKind, event: impl FnOnce() -> DecorEvent) {
        if let Some(sink) = self.sink.as_deref_mut() {
            if sink.wants(kind) {
                sink.send(event());
            }
        }
    }
}

/// A placement site waiting in the worklist.
struct Site {
    rule: usize,
    site: PlacementSite,
    depth: u32,
    seed: u64,
}

/// Rule-driven decorator reacting to scene events.
pub struct Decorator {
    config: DecoratorConfig,
    rules: Arc<CompiledRules>,
    states: Vec<RuleState>,
    prewarmed: Vec<bool>,
    index: InstanceIndex,
    queue: VecDeque<SceneEvent>,
    clock: f64,
}

impl Decorator {
    pub fn new(config: DecoratorConfig, rules: impl Into<Arc<CompiledRules>>) -> Result<Self> {
        config.validate()?;
        let rules = rules.into();
        if !rules.errors().is_empty() {
            warn!(
                "{} rule(s) failed to compile and will not run.",
                rules.errors().len()
            );
        }
        Ok(Self {
            config,
            states: vec![RuleState::Idle; rules.len()],
            prewarmed: vec![false; rules.len()],
            rules,
            index: InstanceIndex::new(),
            queue: VecDeque::new(),
            clock: 0.0,
        })
    }

    pub fn config(&self) -> &DecoratorConfig {
        &self.config
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn index(&self) -> &InstanceIndex {
        &self.index
    }

    /// Seconds accumulated through [`Decorator::tick`].
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn state(&self, rule: &str) -> Option<RuleState> {
        self.rules.position(rule).map(|i| self.states[i])
    }

    /// Queues a scene event for [`Decorator::process_events`].
    pub fn enqueue(&mut self, event: SceneEvent) {
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Handles queued events in arrival order.
    pub fn process_events(&mut self, ctx: &mut DecorContext<'_>) -> DecorationReport {
        let mut report = DecorationReport::default();
        while let Some(event) = self.queue.pop_front() {
            report += self.handle_event(event, ctx);
        }
        report
    }

    /// Handles one scene event immediately.
    pub fn handle_event(
        &mut self,
        event: SceneEvent,
        ctx: &mut DecorContext<'_>,
    ) -> DecorationReport {
        debug!("Handling scene event {:?}.", event);
        let mut report = DecorationReport::default();
        match event {
            SceneEvent::SceneLoaded => {
                for idx in 0..self.rules.len() {
                    report += self.start_rule(idx, None, ctx);
                }
            }
            SceneEvent::RoomCreated(room) => {
                for idx in 0..self.rules.len() {
                    report += self.start_rule(idx, Some(room), ctx);
                }
            }
            SceneEvent::RoomRemoved(room) => {
                for idx in self.live_rules() {
                    let rule = self.rule_id(idx).to_string();
                    let records = self.index.take_room(room, Some(&rule));
                    report.released += self.release(records, ReleaseReason::RoomRemoved, ctx);
                }
            }
            SceneEvent::AnchorCreated { anchor, .. } => {
                let Some(geometry) = ctx.scene.anchor(anchor) else {
                    debug!("Created anchor {} is not in the scene; ignoring.", anchor);
                    return report;
                };
                for idx in self.tracking_rules() {
                    let decorated = self.index.has(self.rule_id(idx), anchor);
                    if self.matches(idx, &geometry) && !decorated {
                        report += self.run_anchor(idx, &geometry, ctx);
                    }
                }
            }
            SceneEvent::AnchorUpdated { anchor, .. } => {
                let geometry = ctx.scene.anchor(anchor);
                for idx in self.tracking_rules() {
                    let rule = self.rule_id(idx).to_string();
                    let records = self.index.take_anchor(anchor, Some(&rule));
                    report.released += self.release(records, ReleaseReason::AnchorUpdated, ctx);
                    if let Some(geometry) = geometry.as_ref().filter(|g| self.matches(idx, g)) {
                        report += self.run_anchor(idx, geometry, ctx);
                    }
                }
            }
            SceneEvent::AnchorRemoved { anchor, .. } => {
                for idx in self.live_rules() {
                    let rule = self.rule_id(idx).to_string();
                    let records = self.index.take_anchor(anchor, Some(&rule));
                    report.released += self.release(records, ReleaseReason::AnchorRemoved, ctx);
                }
            }
            SceneEvent::SceneUnloaded => {
                let records = self.index.take_all(false);
                report.released += self.release(records, ReleaseReason::SceneUnloaded, ctx);
                for idx in 0..self.states.len() {
                    if self.states[idx] != RuleState::Disabled {
                        self.set_state(idx, RuleState::Idle, ctx);
                    }
                }
            }
        }
        report
    }

    /// Decorates every matching anchor in every room with `rule`, skipping anchors that already
    /// carry its instances. Activates the rule if it is idle.
    pub fn decorate_rule(
        &mut self,
        rule: &str,
        ctx: &mut DecorContext<'_>,
    ) -> Result<DecorationReport> {
        let idx = self.position(rule)?;
        if self.states[idx] == RuleState::Disabled {
            debug!("Rule '{}' is disabled; nothing decorated.", rule);
            return Ok(DecorationReport::default());
        }
        self.activate(idx, ctx);
        let mut report = DecorationReport::default();
        for room in ctx.scene.rooms() {
            report += self.decorate_room(idx, room, ctx);
        }
        Ok(report)
    }

    /// Clears `rule`'s instances on `anchor` and decorates it again. Labels are not checked.
    pub fn decorate_anchor(
        &mut self,
        rule: &str,
        anchor: AnchorId,
        ctx: &mut DecorContext<'_>,
    ) -> Result<DecorationReport> {
        let idx = self.position(rule)?;
        if self.states[idx] == RuleState::Disabled {
            debug!("Rule '{}' is disabled; nothing decorated.", rule);
            return Ok(DecorationReport::default());
        }
        let Some(geometry) = ctx.scene.anchor(anchor) else {
            warn!("Anchor {} not found; rule '{}' skipped.", anchor, rule);
            ctx.emit(DecorEventKind::Warning, || DecorEvent::Warning {
                context: rule.to_string(),
                message: format!("anchor {} not found", anchor),
            });
            return Ok(DecorationReport::default());
        };
        self.activate(idx, ctx);
        let records = self.index.take_anchor(anchor, Some(rule));
        let released = self.release(records, ReleaseReason::Cleared, ctx);
        let mut report = self.run_anchor(idx, &geometry, ctx);
        report.released += released;
        Ok(report)
    }

    /// Releases every instance, persistent ones only if `include_persistent` is set.
    pub fn clear_all(&mut self, include_persistent: bool, ctx: &mut DecorContext<'_>) -> usize {
        let records = self.index.take_all(include_persistent);
        self.release(records, ReleaseReason::Cleared, ctx)
    }

    pub fn clear_anchor(&mut self, anchor: AnchorId, ctx: &mut DecorContext<'_>) -> usize {
        let records = self.index.take_anchor(anchor, None);
        self.release(records, ReleaseReason::Cleared, ctx)
    }

    pub fn clear_room(&mut self, room: RoomId, ctx: &mut DecorContext<'_>) -> usize {
        let records = self.index.take_room(room, None);
        self.release(records, ReleaseReason::Cleared, ctx)
    }

    /// Releases every instance produced by `rule`, nested decorations included.
    pub fn clear_rule(&mut self, rule: &str, ctx: &mut DecorContext<'_>) -> Result<usize> {
        self.position(rule)?;
        let records = self.index.take_where(|r| r.rule == rule);
        Ok(self.release(records, ReleaseReason::Cleared, ctx))
    }

    /// Advances the clock and releases instances whose lifetime ended.
    pub fn tick(&mut self, dt: f32, ctx: &mut DecorContext<'_>) -> usize {
        self.clock += f64::from(dt.max(0.0));
        let records = self.index.take_expired(self.clock);
        self.release(records, ReleaseReason::Expired, ctx)
    }

    /// Stops `rule` from reacting to events. Its instances stay until cleared.
    pub fn disable(&mut self, rule: &str, ctx: &mut DecorContext<'_>) -> Result<()> {
        let idx = self.position(rule)?;
        self.set_state(idx, RuleState::Disabled, ctx);
        Ok(())
    }

    /// Returns a disabled rule to `Idle`; it starts again on the next scene or room event.
    pub fn enable(&mut self, rule: &str, ctx: &mut DecorContext<'_>) -> Result<()> {
        let idx = self.position(rule)?;
        if self.states[idx] == RuleState::Disabled {
            self.set_state(idx, RuleState::Idle, ctx);
        }
        Ok(())
    }

    fn position(&self, rule: &str) -> Result<usize> {
        self.rules.position(rule).ok_or_else(|| Error::UnknownRule {
            id: rule.to_string(),
        })
    }

    fn rule_id(&self, idx: usize) -> &str {
        self.rules.by_index(idx).map_or("", CompiledRule::id)
    }

    fn tracking_rules(&self) -> Vec<usize> {
        (0..self.states.len())
            .filter(|&i| self.states[i] == RuleState::Tracking)
            .collect()
    }

    /// Rules that may own instances.
    fn live_rules(&self) -> Vec<usize> {
        (0..self.states.len())
            .filter(|&i| self.states[i] != RuleState::Disabled)
            .collect()
    }

    fn matches(&self, idx: usize, anchor: &AnchorGeometry) -> bool {
        self.rules
            .by_index(idx)
            .is_some_and(|r| r.source.labels.intersects(anchor.labels))
    }

    fn set_state(&mut self, idx: usize, state: RuleState, ctx: &mut DecorContext<'_>) {
        if self.states[idx] == state {
            return;
        }
        self.states[idx] = state;
        let rule = self.rule_id(idx).to_string();
        info!("Rule '{}' is now {:?}.", rule, state);
        ctx.emit(DecorEventKind::RuleStateChanged, || {
            DecorEvent::RuleStateChanged { rule, state }
        });
    }

    /// Moves an idle rule to `Active` or `Tracking` and reserves its pool instances.
    fn activate(&mut self, idx: usize, ctx: &mut DecorContext<'_>) {
        if self.states[idx] != RuleState::Idle {
            return;
        }
        let tracking = self
            .rules
            .by_index(idx)
            .is_some_and(|r| r.source.track_updates);
        let state = if tracking {
            RuleState::Tracking
        } else {
            RuleState::Active
        };
        self.prewarm(idx, ctx);
        self.set_state(idx, state, ctx);
    }

    fn prewarm(&mut self, idx: usize, ctx: &mut DecorContext<'_>) {
        if self.prewarmed[idx] {
            return;
        }
        self.prewarmed[idx] = true;
        let Some(rule) = self.rules.by_index(idx) else {
            return;
        };
        if rule.source.pool_size == 0 {
            return;
        }
        for entry in &rule.source.prefabs {
            ctx.pool.prewarm(&entry.prefab, rule.source.pool_size);
        }
    }

    /// Activates the rule and applies its start policy, to one room or to the scene.
    fn start_rule(
        &mut self,
        idx: usize,
        room: Option<RoomId>,
        ctx: &mut DecorContext<'_>,
    ) -> DecorationReport {
        if self.states[idx] == RuleState::Disabled {
            return DecorationReport::default();
        }
        self.activate(idx, ctx);
        let policy = self
            .rules
            .by_index(idx)
            .map_or(DecorateOnStart::None, |r| r.source.decorate_on_start);
        let current = ctx.scene.current_room();
        let rooms: Vec<RoomId> = match (policy, room) {
            (DecorateOnStart::None, _) => Vec::new(),
            (DecorateOnStart::AllRooms, Some(room)) => vec![room],
            (DecorateOnStart::AllRooms, None) => ctx.scene.rooms(),
            (DecorateOnStart::CurrentRoomOnly, Some(room)) => {
                current.filter(|&c| c == room).into_iter().collect()
            }
            (DecorateOnStart::CurrentRoomOnly, None) => current.into_iter().collect(),
        };
        let mut report = DecorationReport::default();
        for room in rooms {
            report += self.decorate_room(idx, room, ctx);
        }
        report
    }

    fn decorate_room(
        &mut self,
        idx: usize,
        room: RoomId,
        ctx: &mut DecorContext<'_>,
    ) -> DecorationReport {
        let mut report = DecorationReport::default();
        for anchor in ctx.scene.anchors(room) {
            let Some(geometry) = ctx.scene.anchor(anchor) else {
                continue;
            };
            if self.matches(idx, &geometry) && !self.index.has(self.rule_id(idx), anchor) {
                report += self.run_anchor(idx, &geometry, ctx);
            }
        }
        report
    }

    /// Hands records back to the pool, together with whatever was nested on them.
    fn release(
        &mut self,
        mut records: Vec<SpawnedInstanceRecord>,
        reason: ReleaseReason,
        ctx: &mut DecorContext<'_>,
    ) -> usize {
        let nested = self
            .index
            .take_descendants(records.iter().map(|r| r.instance).collect::<Vec<_>>());
        records.extend(nested);
        let count = records.len();
        if count == 0 {
            return 0;
        }
        for record in records {
            ctx.pool.release(record.instance);
        }
        debug!("Released {} instance(s) ({:?}).", count, reason);
        ctx.emit(DecorEventKind::InstancesReleased, || {
            DecorEvent::InstancesReleased { reason, count }
        });
        count
    }

    /// Decorates one top-level anchor, nested sites included.
    fn run_anchor(
        &mut self,
        idx: usize,
        anchor: &AnchorGeometry,
        ctx: &mut DecorContext<'_>,
    ) -> DecorationReport {
        let rules = Arc::clone(&self.rules);
        let Some(top) = rules.by_index(idx) else {
            return DecorationReport::default();
        };

        let mut report = DecorationReport {
            anchors: 1,
            ..Default::default()
        };
        let rule_seed = derive_seed(self.config.base_seed, top.source.seed);
        let mut work = VecDeque::from([Site {
            rule: idx,
            site: PlacementSite::from_anchor(anchor),
            depth: 0,
            seed: seed_for_anchor(rule_seed, anchor.id),
        }]);
        while let Some(site) = work.pop_front() {
            let Some(rule) = rules.by_index(site.rule) else {
                continue;
            };
            self.run_site(top, rule, &site, ctx, &mut report, &mut work);
        }

        debug!(
            "Rule '{}' on anchor {}: {} spawned from {} point(s), {} miss(es), {} rejected.",
            top.id(),
            anchor.id,
            report.spawned,
            report.points,
            report.misses,
            report.rejected
        );
        ctx.emit(DecorEventKind::AnchorDecorated, || {
            DecorEvent::AnchorDecorated {
                rule: top.id().to_string(),
                anchor: anchor.id,
                report,
            }
        });
        report
    }

    /// Runs distribution, placement, constraints, spawn and modifiers for one site and queues
    /// nested sites of the instances it spawns.
    fn run_site(
        &mut self,
        top: &CompiledRule,
        rule: &CompiledRule,
        site: &Site,
        ctx: &mut DecorContext<'_>,
        report: &mut DecorationReport,
        work: &mut VecDeque<Site>,
    ) {
        self.prewarm(site.rule, ctx);
        report.sites += 1;

        let footprint = site.site.extent.footprint();
        let mut rng = StdRng::seed_from_u64(site.seed);
        let cap = self.config.max_points_per_anchor;
        let points = rule
            .source
            .distribution
            .distribute_limited(footprint.into(), &mut rng, cap);
        if points.len() >= cap {
            debug!(
                "Rule '{}' reached the cap of {} point(s) on anchor {}.",
                rule.id(),
                cap,
                site.site.anchor
            );
        }
        report.points += points.len();

        let anchor = site.site.anchor;
        for (i, point) in points.iter().enumerate() {
            let point_seed = derive_seed(site.seed, i as u64);
            let Some(pick) = pick_weighted(&rule.source.prefabs, hash01(point_seed, PREFAB_SALT))
            else {
                continue;
            };
            let prefab = &rule.prefabs[pick];

            let Some(candidate) = resolve_placement(
                ctx.scene,
                ctx.physics,
                &rule.source.placement,
                &site.site,
                point,
                prefab.entry.prefab.clone(),
                point_seed,
            ) else {
                report.misses += 1;
                continue;
            };
            report.hits += 1;

            if let Some(failed) = first_failure(&rule.constraints, &candidate) {
                report.rejected += 1;
                trace!(
                    "Rule '{}': constraint '{}' rejected point {}.",
                    rule.id(),
                    failed.name,
                    i
                );
                ctx.emit(DecorEventKind::CandidateRejected, || {
                    DecorEvent::CandidateRejected {
                        rule: rule.id().to_string(),
                        anchor,
                        constraint: failed.name.clone(),
                    }
                });
                continue;
            }

            let parent = match rule.source.hierarchy {
                SpawnHierarchy::Root => Parent::Root,
                SpawnHierarchy::Anchor => Parent::Anchor(anchor),
                SpawnHierarchy::Room => Parent::Room(site.site.room),
                SpawnHierarchy::Decorator => site
                    .site
                    .host
                    .map_or(Parent::Anchor(anchor), Parent::Instance),
            };
            let pose = Pose::from_position(candidate.hit.point);
            let Some(instance) = ctx.pool.acquire(&prefab.entry.prefab, pose, parent) else {
                report.pool_misses += 1;
                debug!(
                    "Rule '{}': pool for '{}' exhausted; candidate dropped.",
                    rule.id(),
                    prefab.entry.prefab
                );
                ctx.emit(DecorEventKind::PoolExhausted, || DecorEvent::PoolExhausted {
                    rule: rule.id().to_string(),
                    prefab: prefab.entry.prefab.clone(),
                });
                continue;
            };

            let mut spawned = SpawnedInstance::new(InstanceTransform::from_pose(pose));
            for modifier in &rule.modifiers {
                modifier.apply(&mut spawned, &site.site.pose, &candidate, ctx.textures);
            }
            if rule.source.discard_zero_scale && spawned.has_zero_scale(ZERO_SCALE_EPS) {
                ctx.pool.release(instance);
                report.discarded += 1;
                continue;
            }
            ctx.pool.set_transform(instance, &spawned.transform);

            let inserted = self.index.insert(SpawnedInstanceRecord {
                instance,
                prefab: prefab.entry.prefab.clone(),
                anchor,
                room: site.site.room,
                rule: top.id().to_string(),
                depth: site.depth,
                host: site.site.host,
                parent,
                expires_at: rule.source.lifetime.map(|l| self.clock + f64::from(l)),
                persistent: spawned.persistent,
                transform: spawned.transform,
            });
            if !inserted {
                warn!(
                    "Pool handed out instance {} which is already tracked; returning it.",
                    instance
                );
                ctx.pool.release(instance);
                continue;
            }
            report.spawned += 1;
            ctx.emit(DecorEventKind::InstanceSpawned, || DecorEvent::InstanceSpawned {
                rule: rule.id().to_string(),
                anchor,
                instance,
                prefab: prefab.entry.prefab.clone(),
                depth: site.depth,
                position: spawned.transform.position,
            });

            for (ord, &nested_idx) in prefab.decorators.iter().enumerate() {
                self.queue_nested(
                    nested_idx,
                    site,
                    instance,
                    &spawned,
                    prefab.entry.footprint,
                    derive_seed(point_seed, ord as u64),
                    ctx,
                    report,
                    work,
                );
            }
        }
    }

    /// Queues the footprint of a spawned instance as a site for rule `idx`.
    #[allow(clippy::too_many_arguments)]
    fn queue_nested(
        &self,
        idx: usize,
        parent: &Site,
        host: InstanceId,
        spawned: &SpawnedInstance,
        footprint: AnchorExtent,
        seed: u64,
        ctx: &mut DecorContext<'_>,
        report: &mut DecorationReport,
        work: &mut VecDeque<Site>,
    ) {
        let Some(nested) = self.rules.by_index(idx) else {
            return;
        };
        if self.states[idx] == RuleState::Disabled {
            return;
        }
        let depth = parent.depth + 1;
        if depth >= nested.source.recursion_limit {
            report.recursion_stops += 1;
            trace!(
                "Rule '{}' reached its recursion limit {} on anchor {}.",
                nested.id(),
                nested.source.recursion_limit,
                parent.site.anchor
            );
            let rule = nested.id().to_string();
            let anchor = parent.site.anchor;
            ctx.emit(DecorEventKind::RecursionLimitReached, || {
                DecorEvent::RecursionLimitReached {
                    rule,
                    anchor,
                    depth,
                }
            });
            return;
        }

        // The footprint frame has +Z along the instance's up axis.
        let t = spawned.transform;
        let surface = Pose::new(t.position, t.rotation * Quat::from_rotation_x(-FRAC_PI_2));
        work.push_back(Site {
            rule: idx,
            site: PlacementSite {
                anchor: parent.site.anchor,
                room: parent.site.room,
                pose: surface,
                extent: footprint.scaled(Vec3::new(t.scale.x, t.scale.z, t.scale.y)),
                host: Some(host),
            },
            depth,
            seed,
        });
    }
}
