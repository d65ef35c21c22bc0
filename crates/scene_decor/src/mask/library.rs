//! Authoring form of masks and their compilation into shared [`Mask`] nodes.
//!
//! A [`MaskLibrary`] maps ids to [`MaskSpec`]s. Composite layers reference other masks by id and
//! cookie, space-map masks reference textures by id. [`MaskLibrary::compile`] validates every
//! reference, rejects cycles and produces [`CompiledMasks`] in which each id resolves to one
//! shared [`MaskRef`].
use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mask::affine::Affine2D;
use crate::mask::noise::SimplexNoise;
use crate::mask::texture::{TextureChannel, TextureHandle, TextureRegistry};
use crate::mask::{Axis, BlendOp, Mask, MaskId, MaskLayer, MaskParams, MaskRef};
use crate::placement::Targets;

/// Serializable mask description.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum MaskSpec {
    Constant {
        value: f32,
    },
    Random {
        seed: u64,
    },
    CellularNoise {
        #[cfg_attr(feature = "serde", serde(default))]
        transform: Affine2D,
        frequency: f32,
        seed: u64,
    },
    SimplexNoise {
        #[cfg_attr(feature = "serde", serde(default))]
        transform: Affine2D,
        frequency: f32,
        seed: u64,
    },
    Height,
    Slope,
    AnchorDistance {
        tolerance: f32,
    },
    AnchorComponentDistance {
        axis: Axis,
    },
    ColliderProximity {
        targets: Targets,
    },
    InsideRoom,
    Composite {
        op: BlendOp,
        #[cfg_attr(feature = "serde", serde(default))]
        transform: Affine2D,
        layers: Vec<MaskLayer<MaskId>>,
    },
    Cookie {
        #[cfg_attr(feature = "serde", serde(default))]
        transform: Affine2D,
        texture: String,
        channel: TextureChannel,
    },
    Stochastic {
        probability: f32,
        seed: u64,
    },
    SpaceMap {
        texture: String,
        channel: TextureChannel,
        #[cfg_attr(feature = "serde", serde(default))]
        origin: Vec2,
        threshold: f32,
    },
}

impl MaskSpec {
    /// Mask ids this spec depends on.
    pub fn inputs(&self) -> Vec<&MaskId> {
        match self {
            MaskSpec::Composite { layers, .. } => layers.iter().map(|l| &l.mask).collect(),
            _ => Vec::new(),
        }
    }

    fn texture(&self) -> Option<&str> {
        match self {
            MaskSpec::Cookie { texture, .. } | MaskSpec::SpaceMap { texture, .. } => {
                Some(texture.as_str())
            }
            _ => None,
        }
    }

    fn validate(&self, id: &str) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(format!("Mask '{}': {}", id, msg)));
        match self {
            MaskSpec::Composite { layers, .. } => {
                if layers.is_empty() {
                    return invalid("composite requires at least one layer".into());
                }
                if let Some(layer) = layers.iter().find(|l| !l.params.is_valid()) {
                    return invalid(format!(
                        "layer '{}' has limit_min > limit_max or non-finite mapping",
                        layer.mask
                    ));
                }
                Ok(())
            }
            MaskSpec::CellularNoise { frequency, .. } | MaskSpec::SimplexNoise { frequency, .. }
                if !frequency.is_finite() =>
            {
                invalid("frequency must be finite".into())
            }
            MaskSpec::AnchorDistance { tolerance } if tolerance.is_nan() => {
                invalid("tolerance must not be NaN".into())
            }
            MaskSpec::Stochastic { probability, .. } if probability.is_nan() => {
                invalid("probability must not be NaN".into())
            }
            _ => Ok(()),
        }
    }
}

/// Named collection of mask specs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct MaskLibrary {
    pub masks: HashMap<MaskId, MaskSpec>,
}

impl MaskLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mask.
    pub fn add(&mut self, id: &str, spec: MaskSpec) -> &mut Self {
        self.masks.insert(id.to_string(), spec);
        self
    }

    /// Builder variant of [`MaskLibrary::add`].
    pub fn with(mut self, id: &str, spec: MaskSpec) -> Self {
        self.add(id, spec);
        self
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Validates references and compiles every mask.
    pub fn compile(&self, textures: &TextureRegistry) -> Result<CompiledMasks> {
        let mut ids: Vec<&MaskId> = self.masks.keys().collect();
        ids.sort();

        for id in &ids {
            let spec = &self.masks[*id];
            spec.validate(id)?;
            for input in spec.inputs() {
                if !self.masks.contains_key(input) {
                    return Err(Error::UnknownMask { id: input.clone() });
                }
            }
            if let Some(texture) = spec.texture() {
                if !textures.contains(texture) {
                    return Err(Error::MissingTexture {
                        id: texture.to_string(),
                    });
                }
            }
        }

        let order = topo_sort(&self.masks, &ids)?;

        let mut compiled: HashMap<MaskId, MaskRef> = HashMap::with_capacity(order.len());
        for id in order {
            let mask = build(&self.masks[id], textures, &compiled)?;
            compiled.insert(id.clone(), Arc::new(mask));
        }

        Ok(CompiledMasks { masks: compiled })
    }
}

/// Compiled masks keyed by id.
#[derive(Clone, Debug, Default)]
pub struct CompiledMasks {
    masks: HashMap<MaskId, MaskRef>,
}

impl CompiledMasks {
    pub fn get(&self, id: &str) -> Option<MaskRef> {
        self.masks.get(id).cloned()
    }

    /// Like [`CompiledMasks::get`] but reports unknown ids as [`Error::UnknownMask`].
    pub fn resolve(&self, id: &str) -> Result<MaskRef> {
        self.get(id).ok_or_else(|| Error::UnknownMask { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.masks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

/// Orders ids so every mask follows its inputs. Remaining nodes after the sweep form a cycle.
fn topo_sort<'a>(
    specs: &'a HashMap<MaskId, MaskSpec>,
    ids: &[&'a MaskId],
) -> Result<Vec<&'a MaskId>> {
    let mut indeg: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&'a MaskId>> = HashMap::new();

    for id in ids {
        let inputs = specs[*id].inputs();
        indeg.insert(id.as_str(), inputs.len());
        for input in inputs {
            dependents.entry(input.as_str()).or_default().push(id);
        }
    }

    // Reverse-sorted stack so ties pop in id order.
    let mut stack: Vec<&'a MaskId> = ids
        .iter()
        .rev()
        .filter(|id| indeg.get(id.as_str()) == Some(&0))
        .copied()
        .collect();
    let mut out = Vec::with_capacity(ids.len());

    while let Some(n) = stack.pop() {
        out.push(n);
        if let Some(children) = dependents.get(n.as_str()) {
            for &child in children {
                if let Some(e) = indeg.get_mut(child.as_str()) {
                    *e = e.saturating_sub(1);
                    if *e == 0 {
                        stack.push(child);
                    }
                }
            }
        }
    }

    if out.len() != ids.len() {
        let stuck = ids
            .iter()
            .find(|id| indeg.get(id.as_str()).is_some_and(|d| *d > 0))
            .map(|id| id.to_string())
            .unwrap_or_default();
        return Err(Error::MaskCycle { id: stuck });
    }

    Ok(out)
}

fn build(
    spec: &MaskSpec,
    textures: &TextureRegistry,
    compiled: &HashMap<MaskId, MaskRef>,
) -> Result<Mask> {
    let texture = |id: &str| {
        textures
            .get(id)
            .map(|texture| TextureHandle {
                id: id.to_string(),
                texture,
            })
            .ok_or_else(|| Error::MissingTexture { id: id.to_string() })
    };

    Ok(match spec {
        MaskSpec::Constant { value } => Mask::Constant { value: *value },
        MaskSpec::Random { seed } => Mask::Random { seed: *seed },
        MaskSpec::CellularNoise {
            transform,
            frequency,
            seed,
        } => Mask::CellularNoise {
            transform: *transform,
            frequency: *frequency,
            seed: *seed,
        },
        MaskSpec::SimplexNoise {
            transform,
            frequency,
            seed,
        } => Mask::SimplexNoise {
            transform: *transform,
            frequency: *frequency,
            noise: SimplexNoise::new(*seed),
        },
        MaskSpec::Height => Mask::Height,
        MaskSpec::Slope => Mask::Slope,
        MaskSpec::AnchorDistance { tolerance } => Mask::AnchorDistance {
            tolerance: *tolerance,
        },
        MaskSpec::AnchorComponentDistance { axis } => Mask::AnchorComponentDistance { axis: *axis },
        MaskSpec::ColliderProximity { targets } => Mask::ColliderProximity { targets: *targets },
        MaskSpec::InsideRoom => Mask::InsideRoom,
        MaskSpec::Composite {
            op,
            transform,
            layers,
        } => {
            let layers = layers
                .iter()
                .map(|layer| {
                    let mask = compiled.get(&layer.mask).cloned().ok_or_else(|| {
                        Error::UnknownMask {
                            id: layer.mask.clone(),
                        }
                    })?;
                    Ok(MaskLayer::new(mask, layer.params))
                })
                .collect::<Result<Vec<_>>>()?;
            Mask::Composite {
                op: *op,
                transform: *transform,
                layers,
            }
        }
        MaskSpec::Cookie {
            transform,
            texture: id,
            channel,
        } => Mask::Cookie {
            transform: *transform,
            texture: texture(id)?,
            channel: *channel,
        },
        MaskSpec::Stochastic { probability, seed } => Mask::Stochastic {
            probability: *probability,
            seed: *seed,
        },
        MaskSpec::SpaceMap {
            texture: id,
            channel,
            origin,
            threshold,
        } => Mask::SpaceMap {
            texture: texture(id)?,
            channel: *channel,
            origin: *origin,
            threshold: *threshold,
        },
    })
}

/// Layer referencing another mask with the default output mapping.
pub fn layer(id: &str) -> MaskLayer<MaskId> {
    MaskLayer::new(id.to_string(), MaskParams::WIDE)
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::mask::texture::RasterTexture;
    use crate::placement::candidate::Candidate;

    fn composite(layers: &[&str]) -> MaskSpec {
        MaskSpec::Composite {
            op: BlendOp::Add,
            transform: Affine2D::IDENTITY,
            layers: layers.iter().map(|id| layer(id)).collect(),
        }
    }

    #[test]
    fn compiles_composite_and_shares_layers() {
        let lib = MaskLibrary::new()
            .with("a", MaskSpec::Constant { value: 0.3 })
            .with("b", MaskSpec::Constant { value: 0.5 })
            .with("sum", composite(&["a", "b"]));
        let compiled = lib.compile(&TextureRegistry::new()).unwrap();
        assert_eq!(compiled.len(), 3);

        let sum = compiled.resolve("sum").unwrap();
        let c = Candidate::test_at(Vec2::ZERO);
        assert!((sum.raw(&c) - 0.8).abs() < 1e-6);

        let a = compiled.get("a").unwrap();
        match &*sum {
            Mask::Composite { layers, .. } => assert!(Arc::ptr_eq(&layers[0].mask, &a)),
            other => panic!("unexpected mask {other:?}"),
        }
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let lib = MaskLibrary::new().with("sum", composite(&["missing"]));
        let err = lib.compile(&TextureRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownMask { id } if id == "missing"));
    }

    #[test]
    fn cycles_are_rejected() {
        let lib = MaskLibrary::new()
            .with("a", composite(&["b"]))
            .with("b", composite(&["a"]));
        let err = lib.compile(&TextureRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::MaskCycle { .. }));
    }

    #[test]
    fn missing_texture_is_rejected() {
        let lib = MaskLibrary::new().with(
            "cookie",
            MaskSpec::Cookie {
                transform: Affine2D::IDENTITY,
                texture: "stencil".into(),
                channel: TextureChannel::R,
            },
        );
        let err = lib.compile(&TextureRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::MissingTexture { id } if id == "stencil"));

        let mut textures = TextureRegistry::new();
        textures.register("stencil", RasterTexture::new(2, 2, Vec2::ONE, Vec4::ONE));
        assert!(lib.compile(&textures).is_ok());
    }

    #[test]
    fn empty_composite_is_invalid() {
        let lib = MaskLibrary::new().with("empty", composite(&[]));
        assert!(matches!(
            lib.compile(&TextureRegistry::new()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn inverted_layer_limits_are_invalid() {
        let lib = MaskLibrary::new()
            .with("a", MaskSpec::Constant { value: 1.0 })
            .with(
                "bad",
                MaskSpec::Composite {
                    op: BlendOp::Max,
                    transform: Affine2D::IDENTITY,
                    layers: vec![MaskLayer::new(
                        "a".to_string(),
                        MaskParams::WIDE.with_limits(1.0, 0.0),
                    )],
                },
            );
        assert!(matches!(
            lib.compile(&TextureRegistry::new()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
