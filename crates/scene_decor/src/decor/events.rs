//! Event types and sinks for observing decoration.
//!
//! [`crate::decor::orchestrator::Decorator`] reports progress as [`DecorEvent`]s through an
//! optional [`EventSink`] carried by [`crate::decor::orchestrator::DecorContext`]. Sinks can
//! filter by [`DecorEventKind`] so expensive events are only built when someone listens.
use glam::Vec3;

use crate::decor::orchestrator::{DecorationReport, RuleState};
use crate::decor::rule::RuleId;
use crate::scene::pool::{InstanceId, PrefabId};
use crate::scene::AnchorId;

/// Why instances were released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    AnchorRemoved,
    /// The anchor changed; its decoration is rebuilt.
    AnchorUpdated,
    RoomRemoved,
    SceneUnloaded,
    /// The instance lifetime elapsed.
    Expired,
    /// Explicit clear request.
    Cleared,
}

/// Describes events emitted while decorating.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum DecorEvent {
    /// A rule changed state (activation, tracking, disabling).
    RuleStateChanged { rule: RuleId, state: RuleState },

    /// Emitted when a top-level anchor finished decorating, nested sites included.
    AnchorDecorated {
        rule: RuleId,
        anchor: AnchorId,
        report: DecorationReport,
    },

    /// An instance was acquired, modified and kept.
    InstanceSpawned {
        rule: RuleId,
        anchor: AnchorId,
        instance: InstanceId,
        prefab: PrefabId,
        /// Nesting depth, `0` for instances placed on scene anchors.
        depth: u32,
        position: Vec3,
    },

    /// A candidate failed a constraint.
    CandidateRejected {
        rule: RuleId,
        anchor: AnchorId,
        constraint: String,
    },

    /// The pool had no free instance for the prefab.
    PoolExhausted { rule: RuleId, prefab: PrefabId },

    /// A nested site was skipped because the rule's recursion limit was reached.
    RecursionLimitReached {
        rule: RuleId,
        anchor: AnchorId,
        depth: u32,
    },

    /// Instances were handed back to the pool.
    InstancesReleased { reason: ReleaseReason, count: usize },

    /// Non-fatal warning.
    Warning {
        /// Context string (e.g. rule id, anchor id).
        context: String,
        message: String,
    },
}

/// Discriminant of [`DecorEvent`] used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorEventKind {
    RuleStateChanged,
    AnchorDecorated,
    InstanceSpawned,
    CandidateRejected,
    PoolExhausted,
    RecursionLimitReached,
    InstancesReleased,
    Warning,
}

impl DecorEvent {
    pub fn kind(&self) -> DecorEventKind {
        match self {
            DecorEvent::RuleStateChanged { .. } => DecorEventKind::RuleStateChanged,
            DecorEvent::AnchorDecorated { .. } => DecorEventKind::AnchorDecorated,
            DecorEvent::InstanceSpawned { .. } => DecorEventKind::InstanceSpawned,
            DecorEvent::CandidateRejected { .. } => DecorEventKind::CandidateRejected,
            DecorEvent::PoolExhausted { .. } => DecorEventKind::PoolExhausted,
            DecorEvent::RecursionLimitReached { .. } => DecorEventKind::RecursionLimitReached,
            DecorEvent::InstancesReleased { .. } => DecorEventKind::InstancesReleased,
            DecorEvent::Warning { .. } => DecorEventKind::Warning,
        }
    }
}

/// A generic event sink that accepts [`DecorEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: DecorEvent);

    /// Whether events of `kind` should be built and sent at all.
    #[inline]
    fn wants(&self, _kind: DecorEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = DecorEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: DecorEvent) {}

    #[inline]
    fn wants(&self, _kind: DecorEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(DecorEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(DecorEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(DecorEvent),
{
    #[inline]
    fn send(&mut self, event: DecorEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects events in a `Vec`, optionally only some kinds.
#[derive(Default)]
pub struct VecSink {
    events: Vec<DecorEvent>,
    only: Option<Vec<DecorEventKind>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
            only: None,
        }
    }

    /// Restricts collection to the given kinds.
    pub fn only(mut self, kinds: impl IntoIterator<Item = DecorEventKind>) -> Self {
        self.only = Some(kinds.into_iter().collect());
        self
    }

    pub fn into_inner(self) -> Vec<DecorEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[DecorEvent] {
        &self.events
    }

    pub fn count(&self, kind: DecorEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: DecorEvent) {
        if self.wants(event.kind()) {
            self.events.push(event);
        }
    }

    fn wants(&self, kind: DecorEventKind) -> bool {
        self.only.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn into_inner(self) -> Vec<S> {
        self.sinks
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: DecorEvent) {
        let kind = event.kind();
        let mut targets: Vec<usize> = (0..self.sinks.len())
            .filter(|&i| self.sinks[i].wants(kind))
            .collect();
        let Some(last) = targets.pop() else {
            return;
        };
        for i in targets {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last].send(event);
    }

    fn wants(&self, kind: DecorEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

/// Minimal adapter trait for types that can expose an [`EventSink`].
pub trait AsEventSink {
    fn as_event_sink(&mut self) -> &mut dyn EventSink;
}

impl AsEventSink for VecSink {
    fn as_event_sink(&mut self) -> &mut dyn EventSink {
        self
    }
}
