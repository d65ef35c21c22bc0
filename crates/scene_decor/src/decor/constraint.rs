//! Constraints: named mask gates applied to each candidate.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mask::library::CompiledMasks;
use crate::mask::{MaskId, MaskParams, MaskRef};
use crate::placement::candidate::Candidate;

/// Which mask path gates the candidate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckMode {
    /// `min <= mask.sample <= max`.
    #[default]
    Value,
    /// `mask.check`.
    Bool,
}

/// A gate combining a mask with a pass/fail rule.
///
/// `M` is the mask reference: a [`MaskId`] while authoring ([`ConstraintSpec`]) and a shared
/// [`MaskRef`] once compiled.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Constraint<M = MaskRef> {
    pub name: String,
    pub enabled: bool,
    pub mask: M,
    /// Output mapping applied before the `Value` comparison.
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: MaskParams,
    pub mode: CheckMode,
    pub min: f32,
    pub max: f32,
}

pub type ConstraintSpec = Constraint<MaskId>;

impl<M> Constraint<M> {
    /// `Value`-mode constraint passing when the sample lies in `[min, max]`.
    pub fn value(name: impl Into<String>, mask: M, min: f32, max: f32) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            mask,
            params: MaskParams::WIDE,
            mode: CheckMode::Value,
            min,
            max,
        }
    }

    /// `Bool`-mode constraint passing when the mask's check holds.
    pub fn boolean(name: impl Into<String>, mask: M) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            mask,
            params: MaskParams::WIDE,
            mode: CheckMode::Bool,
            min: f32::MIN,
            max: f32::MAX,
        }
    }

    pub fn with_params(mut self, params: MaskParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl ConstraintSpec {
    /// Resolves the mask id against compiled masks.
    pub fn resolve(&self, masks: &CompiledMasks) -> Result<Constraint> {
        if self.mode == CheckMode::Value && self.min > self.max {
            return Err(Error::InvalidConfig(format!(
                "constraint '{}' has min > max",
                self.name
            )));
        }
        Ok(Constraint {
            name: self.name.clone(),
            enabled: self.enabled,
            mask: masks.resolve(&self.mask)?,
            params: self.params,
            mode: self.mode,
            min: self.min,
            max: self.max,
        })
    }
}

impl Constraint {
    /// Evaluates both mask paths; the mode decides which one gates.
    pub fn passes(&self, candidate: &Candidate) -> bool {
        if !self.enabled {
            return true;
        }
        let value = self.mask.sample_with(candidate, &self.params);
        let checked = self.mask.check(candidate);
        match self.mode {
            CheckMode::Value => value >= self.min && value <= self.max,
            CheckMode::Bool => checked,
        }
    }
}

/// Returns the first enabled constraint that rejects `candidate`, in declared order.
pub fn first_failure<'a>(
    constraints: &'a [Constraint],
    candidate: &Candidate,
) -> Option<&'a Constraint> {
    constraints.iter().find(|c| !c.passes(candidate))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec2;

    use super::*;
    use crate::mask::library::{MaskLibrary, MaskSpec};
    use crate::mask::texture::TextureRegistry;
    use crate::mask::Mask;

    fn constant(value: f32) -> MaskRef {
        Arc::new(Mask::Constant { value })
    }

    #[test]
    fn value_mode_rejects_out_of_range_sample() {
        let c = Candidate::test_at(Vec2::ZERO);
        let constraint = Constraint::value("height", constant(15.0), 0.0, 10.0);
        assert!(!constraint.passes(&c));
        let constraint = Constraint::value("height", constant(5.0), 0.0, 10.0);
        assert!(constraint.passes(&c));
    }

    #[test]
    fn value_mode_uses_its_own_mapping() {
        let c = Candidate::test_at(Vec2::ZERO);
        let constraint = Constraint::value("scaled", constant(15.0), 0.0, 10.0)
            .with_params(MaskParams::WIDE.with_scale(0.5));
        assert!(constraint.passes(&c));
    }

    #[test]
    fn bool_mode_ignores_sample_value() {
        let c = Candidate::test_at(Vec2::ZERO);
        // Constant 0 samples inside any range but its check is false.
        let mut constraint = Constraint::boolean("flag", constant(0.0));
        constraint.min = -1.0;
        constraint.max = 1.0;
        assert!(!constraint.passes(&c));
        assert!(Constraint::boolean("flag", constant(1.0)).passes(&c));
    }

    #[test]
    fn disabled_constraints_always_pass() {
        let c = Candidate::test_at(Vec2::ZERO);
        let constraint = Constraint::value("off", constant(15.0), 0.0, 10.0).with_enabled(false);
        assert!(constraint.passes(&c));
    }

    #[test]
    fn first_failure_short_circuits_in_order() {
        let c = Candidate::test_at(Vec2::ZERO);
        let constraints = vec![
            Constraint::value("ok", constant(1.0), 0.0, 2.0),
            Constraint::value("first", constant(3.0), 0.0, 2.0),
            Constraint::boolean("second", constant(0.0)),
        ];
        let failed = first_failure(&constraints, &c).map(|c| c.name.as_str());
        assert_eq!(failed, Some("first"));
        assert!(first_failure(&constraints[..1], &c).is_none());
    }

    #[test]
    fn spec_resolution_reports_unknown_masks() {
        let masks = MaskLibrary::new()
            .with("one", MaskSpec::Constant { value: 1.0 })
            .compile(&TextureRegistry::new())
            .unwrap();
        let spec = ConstraintSpec::value("c", "one".to_string(), 0.0, 2.0);
        assert!(spec.resolve(&masks).unwrap().passes(&Candidate::test_at(Vec2::ZERO)));
        let spec = ConstraintSpec::value("c", "two".to_string(), 0.0, 2.0);
        assert!(matches!(spec.resolve(&masks), Err(Error::UnknownMask { .. })));
    }
}
