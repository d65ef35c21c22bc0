//! Modifiers: post-spawn mutations of an instance transform.
//!
//! Modifiers run in declared order on every spawned instance. They only touch scale, rotation and
//! the persistence flag, and they never fail: a modifier whose external input is unavailable
//! (for example an unregistered color map) leaves the instance untouched.
use glam::{Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::mask::affine::Affine2D;
use crate::mask::library::CompiledMasks;
use crate::mask::texture::{TextureChannel, TextureRegistry};
use crate::mask::{MaskId, MaskLayer, MaskRef};
use crate::placement::candidate::Candidate;
use crate::scene::pool::InstanceTransform;
use crate::scene::Pose;

/// Transform and flags of a freshly spawned instance while modifiers run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnedInstance {
    pub transform: InstanceTransform,
    /// Survives scene-unload clears.
    pub persistent: bool,
}

impl SpawnedInstance {
    pub fn new(transform: InstanceTransform) -> Self {
        Self {
            transform,
            persistent: false,
        }
    }

    /// Returns `true` if any scale axis is within `eps` of zero.
    pub fn has_zero_scale(&self, eps: f32) -> bool {
        self.transform.scale.abs().min_element() <= eps
    }
}

/// A post-spawn transform mutator.
///
/// `M` is the mask reference: a [`MaskId`] while authoring ([`ModifierSpec`]) and a shared
/// [`MaskRef`] once compiled.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum Modifier<M = MaskRef> {
    /// Multiplies all scale axes by the mapped mask sample.
    ScaleUniform { layer: MaskLayer<M> },
    /// Multiplies each configured axis by its own mapped mask sample.
    ScalePerAxis {
        x: Option<MaskLayer<M>>,
        y: Option<MaskLayer<M>>,
        z: Option<MaskLayer<M>>,
    },
    /// Spins the instance about its up axis by `channel value * max_degrees`, read from a color
    /// map at the transformed local position.
    RotateToColorMap {
        texture: String,
        channel: TextureChannel,
        #[cfg_attr(feature = "serde", serde(default))]
        transform: Affine2D,
        max_degrees: f32,
    },
    /// Tilts the instance so its up axis matches the anchor surface normal.
    KeepUprightWithAnchor,
    /// Tilts the instance so its up axis matches the hit normal.
    KeepUprightWithSurface,
    /// Marks the instance persistent across scene unloads.
    DontDestroy,
}

pub type ModifierSpec = Modifier<MaskId>;

impl ModifierSpec {
    /// Resolves mask ids against compiled masks.
    pub fn resolve(&self, masks: &CompiledMasks) -> Result<Modifier> {
        let layer = |l: &MaskLayer<MaskId>| -> Result<MaskLayer<MaskRef>> {
            Ok(MaskLayer::new(masks.resolve(&l.mask)?, l.params))
        };
        let axis = |l: &Option<MaskLayer<MaskId>>| l.as_ref().map(layer).transpose();

        Ok(match self {
            Modifier::ScaleUniform { layer: l } => Modifier::ScaleUniform { layer: layer(l)? },
            Modifier::ScalePerAxis { x, y, z } => Modifier::ScalePerAxis {
                x: axis(x)?,
                y: axis(y)?,
                z: axis(z)?,
            },
            Modifier::RotateToColorMap {
                texture,
                channel,
                transform,
                max_degrees,
            } => Modifier::RotateToColorMap {
                texture: texture.clone(),
                channel: *channel,
                transform: *transform,
                max_degrees: *max_degrees,
            },
            Modifier::KeepUprightWithAnchor => Modifier::KeepUprightWithAnchor,
            Modifier::KeepUprightWithSurface => Modifier::KeepUprightWithSurface,
            Modifier::DontDestroy => Modifier::DontDestroy,
        })
    }
}

impl Modifier {
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::ScaleUniform { .. } => "scale-uniform",
            Modifier::ScalePerAxis { .. } => "scale-per-axis",
            Modifier::RotateToColorMap { .. } => "rotate-to-color-map",
            Modifier::KeepUprightWithAnchor => "keep-upright-with-anchor",
            Modifier::KeepUprightWithSurface => "keep-upright-with-surface",
            Modifier::DontDestroy => "dont-destroy",
        }
    }

    /// Applies the modifier. `surface` is the pose of the decorated surface (anchor or host
    /// instance), whose local +Z is the surface normal.
    pub fn apply(
        &self,
        instance: &mut SpawnedInstance,
        surface: &Pose,
        candidate: &Candidate,
        textures: &TextureRegistry,
    ) {
        let t = &mut instance.transform;
        match self {
            Modifier::ScaleUniform { layer } => {
                t.scale *= layer.mask.sample_with(candidate, &layer.params);
            }
            Modifier::ScalePerAxis { x, y, z } => {
                for (i, layer) in [x, y, z].into_iter().enumerate() {
                    if let Some(layer) = layer {
                        t.scale[i] *= layer.mask.sample_with(candidate, &layer.params);
                    }
                }
            }
            Modifier::RotateToColorMap {
                texture,
                channel,
                transform,
                max_degrees,
            } => {
                let Some(map) = textures.get(texture) else {
                    debug!("Color map '{}' not registered; rotation skipped.", texture);
                    return;
                };
                let value = map.sample(*channel, transform.apply(candidate.local_pos));
                let up = t.rotation * Vec3::Y;
                let spin = Quat::from_axis_angle(up, (value * max_degrees).to_radians());
                t.rotation = (spin * t.rotation).normalize();
            }
            Modifier::KeepUprightWithAnchor => align_up(t, surface.forward()),
            Modifier::KeepUprightWithSurface => align_up(t, candidate.hit.normal),
            Modifier::DontDestroy => instance.persistent = true,
        }
    }
}

/// Rotates `t` by the shortest arc taking its up axis onto `target`, keeping its heading.
fn align_up(t: &mut InstanceTransform, target: Vec3) {
    let Some(target) = target.try_normalize() else {
        return;
    };
    let up = (t.rotation * Vec3::Y).normalize();
    t.rotation = (Quat::from_rotation_arc(up, target) * t.rotation).normalize();
}
