//! Affine placement of 2D masks relative to the anchor frame.
use glam::{Mat3, Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Offset, rotation, shear and scale applied to a candidate's local position before a 2D mask
/// samples it. The matrix is `Translate · Rotate · Shear · Scale`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2D {
    pub offset: Vec2,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f32,
    pub scale: Vec2,
    /// `x' = x + shear.x * y`, `y' = y + shear.y * x`.
    pub shear: Vec2,
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Self = Self {
        offset: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
        shear: Vec2::ZERO,
    };

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec2::splat(scale);
        self
    }

    pub fn with_shear(mut self, shear: Vec2) -> Self {
        self.shear = shear;
        self
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Homogeneous 3x3 matrix for this transform.
    pub fn matrix(&self) -> Mat3 {
        let translate = Mat3::from_translation(self.offset);
        let rotate = Mat3::from_angle(self.rotation.to_radians());
        let shear = Mat3::from_cols(
            Vec3::new(1.0, self.shear.y, 0.0),
            Vec3::new(self.shear.x, 1.0, 0.0),
            Vec3::Z,
        );
        let scale = Mat3::from_scale(self.scale);
        translate * rotate * shear * scale
    }

    /// Transforms `p` and divides by the homogeneous `w`.
    pub fn apply(&self, p: Vec2) -> Vec2 {
        if self.is_identity() {
            return p;
        }
        let h = self.matrix() * p.extend(1.0);
        if h.z.abs() > f32::EPSILON {
            h.truncate() / h.z
        } else {
            h.truncate()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn identity_leaves_points_untouched() {
        let p = Vec2::new(1.5, -2.0);
        assert_eq!(Affine2D::IDENTITY.apply(p), p);
    }

    #[test]
    fn scale_is_applied_before_rotation_and_offset() {
        let t = Affine2D::IDENTITY
            .with_scale(Vec2::new(2.0, 1.0))
            .with_rotation(90.0)
            .with_offset(Vec2::new(10.0, 0.0));
        // (1,0) -> scale (2,0) -> rotate (0,2) -> translate (10,2)
        assert!(approx(t.apply(Vec2::new(1.0, 0.0)), Vec2::new(10.0, 2.0)));
    }

    #[test]
    fn shear_skews_along_both_axes() {
        let t = Affine2D::IDENTITY.with_shear(Vec2::new(0.5, 0.0));
        assert!(approx(t.apply(Vec2::new(0.0, 2.0)), Vec2::new(1.0, 2.0)));
        let t = Affine2D::IDENTITY.with_shear(Vec2::new(0.0, 0.25));
        assert!(approx(t.apply(Vec2::new(4.0, 0.0)), Vec2::new(4.0, 1.0)));
    }
}
