//! Decoration rules and their compilation.
//!
//! A [`DecorationRule`] is plain configuration: which anchors to act on, what to spawn, how to
//! sample and place, which constraints gate candidates and which modifiers run afterwards.
//! [`RuleSet::compile`] resolves mask ids and nested-rule references into [`CompiledRules`].
//! Faulty rules are reported and left out; the remaining rules compile normally.
use std::collections::{HashMap, HashSet};

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decor::constraint::{Constraint, ConstraintSpec};
use crate::decor::modifier::{Modifier, ModifierSpec};
use crate::distribution::{DistributionKind, GridDistribution};
use crate::error::{Error, Result};
use crate::mask::library::CompiledMasks;
use crate::placement::{PlacementMode, PlacementSettings, RaySettings, TargetSettings};
use crate::scene::pool::PrefabId;
use crate::scene::{AnchorExtent, AnchorLabels};

pub type RuleId = String;

/// Which anchors a rule decorates when the scene loads or a room appears.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecorateOnStart {
    /// Only explicit requests and tracked anchor events decorate.
    None,
    CurrentRoomOnly,
    #[default]
    AllRooms,
}

/// Where spawned instances are attached.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpawnHierarchy {
    Root,
    #[default]
    Anchor,
    Room,
    /// Under the instance hosting a nested decoration; top-level spawns fall back to the anchor.
    Decorator,
}

/// A prefab a rule may spawn.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PrefabEntry {
    pub prefab: PrefabId,
    pub weight: f32,
    /// Decorable surface of the spawned prefab, in a frame whose +Z is the prefab's up axis.
    /// Nested decorators sample this footprint.
    pub footprint: AnchorExtent,
    /// Rules run on every spawned instance of this prefab.
    pub decorators: Vec<RuleId>,
}

impl PrefabEntry {
    pub fn new(prefab: impl Into<String>) -> Self {
        Self {
            prefab: PrefabId::new(prefab),
            weight: 1.0,
            footprint: AnchorExtent::None,
            decorators: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_footprint(mut self, footprint: AnchorExtent) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_decorator(mut self, rule: impl Into<RuleId>) -> Self {
        self.decorators.push(rule.into());
        self
    }
}

/// Declarative decoration rule.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct DecorationRule {
    pub id: RuleId,
    pub enabled: bool,
    /// Anchors carrying any of these labels are decorated. Empty means nested use only.
    pub labels: AnchorLabels,
    pub prefabs: Vec<PrefabEntry>,
    /// Instances reserved per prefab on activation.
    pub pool_size: usize,
    pub distribution: DistributionKind,
    pub placement: PlacementSettings,
    pub hierarchy: SpawnHierarchy,
    pub constraints: Vec<ConstraintSpec>,
    pub modifiers: Vec<ModifierSpec>,
    /// Releases instances whose final scale has a zero axis.
    pub discard_zero_scale: bool,
    /// Seconds until spawned instances are released.
    pub lifetime: Option<f32>,
    /// Nested sites at this depth or deeper are not decorated.
    pub recursion_limit: u32,
    pub decorate_on_start: DecorateOnStart,
    pub track_updates: bool,
    pub seed: u64,
}

impl DecorationRule {
    pub fn new(id: impl Into<RuleId>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            labels: AnchorLabels::NONE,
            prefabs: Vec::new(),
            pool_size: 0,
            distribution: GridDistribution::new(Vec2::splat(0.5)).into(),
            placement: PlacementSettings::default(),
            hierarchy: SpawnHierarchy::default(),
            constraints: Vec::new(),
            modifiers: Vec::new(),
            discard_zero_scale: true,
            lifetime: None,
            recursion_limit: 1,
            decorate_on_start: DecorateOnStart::default(),
            track_updates: true,
            seed: 0,
        }
    }

    pub fn with_labels(mut self, labels: AnchorLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_prefab(self, prefab: impl Into<String>) -> Self {
        self.with_prefab_entry(PrefabEntry::new(prefab))
    }

    pub fn with_prefab_entry(mut self, entry: PrefabEntry) -> Self {
        self.prefabs.push(entry);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_distribution(mut self, distribution: impl Into<DistributionKind>) -> Self {
        self.distribution = distribution.into();
        self
    }

    pub fn with_placement(mut self, placement: PlacementSettings) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_mode(mut self, mode: PlacementMode) -> Self {
        self.placement.mode = mode;
        self
    }

    pub fn with_ray(mut self, ray: RaySettings) -> Self {
        self.placement.ray = ray;
        self
    }

    pub fn with_targets(mut self, targets: TargetSettings) -> Self {
        self.placement.targets = targets;
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: SpawnHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_constraint(mut self, constraint: ConstraintSpec) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_modifier(mut self, modifier: ModifierSpec) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_discard_zero_scale(mut self, discard: bool) -> Self {
        self.discard_zero_scale = discard;
        self
    }

    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_decorate_on_start(mut self, policy: DecorateOnStart) -> Self {
        self.decorate_on_start = policy;
        self
    }

    pub fn with_track_updates(mut self, track: bool) -> Self {
        self.track_updates = track;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Checks the rule in isolation (references are resolved by [`RuleSet::compile`]).
    pub fn validate(&self) -> Result<()> {
        if self.prefabs.is_empty() {
            return Err(Error::MissingPrefabs {
                rule: self.id.clone(),
            });
        }
        let context = |e: Error| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("rule '{}': {}", self.id, msg))
            }
            other => other,
        };
        self.distribution.validate().map_err(context)?;
        self.placement.validate().map_err(context)?;
        if let Some(lifetime) = self.lifetime {
            if !(lifetime.is_finite() && lifetime > 0.0) {
                return Err(context(Error::InvalidConfig(format!(
                    "lifetime must be positive, got {}",
                    lifetime
                ))));
            }
        }
        Ok(())
    }
}

/// A prefab entry with nested decorators resolved to rule indices.
#[derive(Clone, Debug)]
pub struct CompiledPrefab {
    pub entry: PrefabEntry,
    pub decorators: Vec<usize>,
}

/// A rule ready for execution.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    pub source: DecorationRule,
    pub prefabs: Vec<CompiledPrefab>,
    pub constraints: Vec<Constraint>,
    pub modifiers: Vec<Modifier>,
}

impl CompiledRule {
    pub fn id(&self) -> &str {
        &self.source.id
    }

    fn compile(rule: &DecorationRule, masks: &CompiledMasks) -> Result<Self> {
        rule.validate()?;
        let constraints = rule
            .constraints
            .iter()
            .map(|c| c.resolve(masks))
            .collect::<Result<Vec<_>>>()?;
        let modifiers = rule
            .modifiers
            .iter()
            .map(|m| m.resolve(masks))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            source: rule.clone(),
            prefabs: Vec::new(),
            constraints,
            modifiers,
        })
    }
}

/// Ordered collection of rules.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    pub rules: Vec<DecorationRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: DecorationRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn with(mut self, rule: DecorationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Compiles every enabled rule. Rules that fail (missing prefabs, bad parameters, unknown
    /// masks, duplicate ids, nested references to unknown or failed rules) are logged, recorded
    /// in [`CompiledRules::errors`] and left out.
    pub fn compile(&self, masks: &CompiledMasks) -> CompiledRules {
        let mut errors: Vec<(RuleId, Error)> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates: Vec<CompiledRule> = Vec::new();

        for rule in &self.rules {
            if !rule.enabled {
                debug!("Rule '{}' is disabled; skipping.", rule.id);
                continue;
            }
            if !seen.insert(rule.id.as_str()) {
                errors.push((
                    rule.id.clone(),
                    Error::InvalidConfig(format!("duplicate rule id '{}'", rule.id)),
                ));
                continue;
            }
            match CompiledRule::compile(rule, masks) {
                Ok(compiled) => candidates.push(compiled),
                Err(e) => errors.push((rule.id.clone(), e)),
            }
        }

        // Drop rules whose nested decorators do not resolve until the set is closed.
        loop {
            let ids: HashSet<&str> = candidates.iter().map(|r| r.id()).collect();
            let broken = candidates.iter().enumerate().find_map(|(pos, r)| {
                r.source
                    .prefabs
                    .iter()
                    .flat_map(|p| p.decorators.iter())
                    .find(|d| !ids.contains(d.as_str()))
                    .map(|missing| (pos, missing.clone()))
            });
            let Some((pos, missing)) = broken else { break };
            let rule = candidates.remove(pos);
            errors.push((rule.source.id, Error::UnknownRule { id: missing }));
        }

        let index: HashMap<RuleId, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, r)| (r.source.id.clone(), i))
            .collect();
        for rule in &mut candidates {
            rule.prefabs = rule
                .source
                .prefabs
                .iter()
                .map(|entry| CompiledPrefab {
                    entry: entry.clone(),
                    decorators: entry
                        .decorators
                        .iter()
                        .filter_map(|d| index.get(d).copied())
                        .collect(),
                })
                .collect();
        }

        for (id, e) in &errors {
            warn!("Rule '{}' disabled: {}.", id, e);
        }

        CompiledRules {
            rules: candidates,
            index,
            errors,
        }
    }
}

/// Compiled rules plus the errors of rules that were left out.
#[derive(Debug, Default)]
pub struct CompiledRules {
    rules: Vec<CompiledRule>,
    index: HashMap<RuleId, usize>,
    errors: Vec<(RuleId, Error)>,
}

impl CompiledRules {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CompiledRule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn by_index(&self, index: usize) -> Option<&CompiledRule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Rules rejected during compilation.
    pub fn errors(&self) -> &[(RuleId, Error)] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::library::{MaskLibrary, MaskSpec};
    use crate::mask::texture::TextureRegistry;

    fn masks() -> CompiledMasks {
        MaskLibrary::new()
            .with("flat", MaskSpec::Slope)
            .compile(&TextureRegistry::new())
            .unwrap()
    }

    #[test]
    fn rule_without_prefabs_is_disabled_but_others_compile() {
        let set = RuleSet::new()
            .with(DecorationRule::new("empty").with_labels(AnchorLabels::FLOOR))
            .with(
                DecorationRule::new("rocks")
                    .with_labels(AnchorLabels::FLOOR)
                    .with_prefab("rock"),
            );
        let compiled = set.compile(&masks());
        assert_eq!(compiled.len(), 1);
        assert!(compiled.get("rocks").is_some());
        assert!(matches!(
            compiled.errors(),
            [(id, Error::MissingPrefabs { .. })] if id == "empty"
        ));
    }

    #[test]
    fn unknown_constraint_mask_disables_rule() {
        let set = RuleSet::new().with(
            DecorationRule::new("rocks")
                .with_prefab("rock")
                .with_constraint(ConstraintSpec::value("slope", "steep".into(), 0.0, 10.0)),
        );
        let compiled = set.compile(&masks());
        assert!(compiled.is_empty());
        assert!(matches!(compiled.errors()[0].1, Error::UnknownMask { .. }));
    }

    #[test]
    fn nested_references_resolve_to_indices() {
        let set = RuleSet::new()
            .with(
                DecorationRule::new("tables")
                    .with_labels(AnchorLabels::FLOOR)
                    .with_prefab_entry(PrefabEntry::new("table").with_decorator("cups")),
            )
            .with(DecorationRule::new("cups").with_prefab("cup"));
        let compiled = set.compile(&masks());
        let tables = compiled.get("tables").unwrap();
        assert_eq!(tables.prefabs[0].decorators, vec![compiled.position("cups").unwrap()]);
    }

    #[test]
    fn dangling_nested_reference_cascades() {
        let set = RuleSet::new()
            .with(
                DecorationRule::new("a")
                    .with_prefab_entry(PrefabEntry::new("x").with_decorator("b")),
            )
            .with(
                DecorationRule::new("b")
                    .with_prefab_entry(PrefabEntry::new("y").with_decorator("missing")),
            )
            .with(DecorationRule::new("c").with_prefab("z"));
        let compiled = set.compile(&masks());
        assert_eq!(compiled.len(), 1);
        assert!(compiled.get("c").is_some());
        assert_eq!(compiled.errors().len(), 2);
    }

    #[test]
    fn host_of_a_failed_nested_rule_is_dropped() {
        let set = RuleSet::new()
            .with(
                DecorationRule::new("tables")
                    .with_labels(AnchorLabels::FLOOR)
                    .with_prefab_entry(PrefabEntry::new("table").with_decorator("cups")),
            )
            // No prefabs: "cups" fails, so "tables" loses its nested rule.
            .with(DecorationRule::new("cups"));
        let compiled = set.compile(&masks());
        assert!(compiled.is_empty());
        assert!(matches!(
            compiled.errors(),
            [(a, Error::MissingPrefabs { .. }), (b, Error::UnknownRule { id })]
                if a == "cups" && b == "tables" && id == "cups"
        ));
    }

    #[test]
    fn duplicate_ids_keep_the_first() {
        let set = RuleSet::new()
            .with(DecorationRule::new("a").with_prefab("x"))
            .with(DecorationRule::new("a").with_prefab("y"));
        let compiled = set.compile(&masks());
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled.get("a").unwrap().prefabs[0].entry.prefab.as_str(), "x");
    }

    #[test]
    fn invalid_distribution_is_reported_with_rule_context() {
        let rule = DecorationRule::new("bad")
            .with_prefab("x")
            .with_distribution(GridDistribution::new(Vec2::ZERO));
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("rule 'bad'"));
    }
}
