//! Texture traits and registry for cookie, space-map and color-map lookups.
//!
//! - Define custom sources by implementing [`Texture`].
//! - Manage instances with [`TextureRegistry`].
//! - Sample channels via [`TextureChannel`].
//! - [`RasterTexture`] is a ready-made in-memory RGBA raster.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::{Vec2, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Texture channel to sample from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureChannel {
    R,
    G,
    B,
    A,
}

impl TextureChannel {
    #[inline]
    fn index(self) -> usize {
        match self {
            TextureChannel::R => 0,
            TextureChannel::G => 1,
            TextureChannel::B => 2,
            TextureChannel::A => 3,
        }
    }
}

/// 2D texture sampled at a position in the caller's coordinate space.
/// Implementors map that position to their own texel space.
pub trait Texture: Send + Sync {
    fn sample(&self, channel: TextureChannel, p: Vec2) -> f32;
}

/// Registry for textures keyed by string id.
#[non_exhaustive]
#[derive(Clone, Default)]
pub struct TextureRegistry {
    textures: HashMap<String, Arc<dyn Texture>>,
}

impl fmt::Debug for TextureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.textures.keys().collect();
        ids.sort();
        f.debug_struct("TextureRegistry").field("ids", &ids).finish()
    }
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Registers a texture under `id`, replacing any previous entry.
    pub fn register<T>(&mut self, id: impl Into<String>, texture: T)
    where
        T: Texture + 'static,
    {
        self.textures.insert(id.into(), Arc::new(texture));
    }

    pub fn register_arc(&mut self, id: impl Into<String>, texture: Arc<dyn Texture + 'static>) {
        self.textures.insert(id.into(), texture);
    }

    /// Returns `true` if the texture was found and removed.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.textures.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.textures.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Texture>> {
        self.textures.get(id).cloned()
    }

    /// Samples `texture_id`, returning 0 for unknown ids.
    #[inline]
    pub fn sample(&self, texture_id: &str, channel: TextureChannel, p: Vec2) -> f32 {
        if let Some(tex) = self.textures.get(texture_id) {
            tex.sample(channel, p)
        } else {
            warn!("Unknown texture id '{}'.", texture_id);
            0.0
        }
    }
}

/// A texture resolved at compile time, kept with its id for diagnostics.
#[derive(Clone)]
pub struct TextureHandle {
    pub id: String,
    pub texture: Arc<dyn Texture>,
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextureHandle").field(&self.id).finish()
    }
}

impl TextureHandle {
    #[inline]
    pub fn sample(&self, channel: TextureChannel, p: Vec2) -> f32 {
        self.texture.sample(channel, p)
    }
}

/// RGBA float raster mapped over a centered rectangle of `domain_extent`:
/// x in `[-w/2, w/2]`, y in `[-h/2, h/2]`, row 0 at the bottom. Sampling is bilinear and clamps
/// at the borders.
#[derive(Clone, Debug)]
pub struct RasterTexture {
    width: usize,
    height: usize,
    domain_extent: Vec2,
    texels: Vec<Vec4>,
}

impl RasterTexture {
    /// Creates a raster filled with `fill`. Zero dimensions are raised to 1.
    pub fn new(width: usize, height: usize, domain_extent: Vec2, fill: Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            domain_extent,
            texels: vec![fill; width * height],
        }
    }

    /// Builds a raster by evaluating `f(u, v)` at texel centers, with `u, v` in `[0, 1]`.
    pub fn from_fn(
        width: usize,
        height: usize,
        domain_extent: Vec2,
        mut f: impl FnMut(f32, f32) -> Vec4,
    ) -> Self {
        let mut raster = Self::new(width, height, domain_extent, Vec4::ZERO);
        for y in 0..raster.height {
            for x in 0..raster.width {
                let u = (x as f32 + 0.5) / raster.width as f32;
                let v = (y as f32 + 0.5) / raster.height as f32;
                raster.texels[y * raster.width + x] = f(u, v);
            }
        }
        raster
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set(&mut self, x: usize, y: usize, value: Vec4) {
        if x < self.width && y < self.height {
            self.texels[y * self.width + x] = value;
        }
    }

    #[inline]
    fn texel(&self, x: usize, y: usize) -> Vec4 {
        self.texels[y.min(self.height - 1) * self.width + x.min(self.width - 1)]
    }
}

impl Texture for RasterTexture {
    fn sample(&self, channel: TextureChannel, p: Vec2) -> f32 {
        let (dw, dh) = (self.domain_extent.x, self.domain_extent.y);
        if dw == 0.0 || dh == 0.0 {
            return 0.0;
        }
        let u = ((p.x / dw) + 0.5).clamp(0.0, 1.0);
        let v = ((p.y / dh) + 0.5).clamp(0.0, 1.0);

        let fx = (u * self.width as f32 - 0.5).max(0.0);
        let fy = (v * self.height as f32 - 0.5).max(0.0);
        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let c = channel.index();
        let s00 = self.texel(x0, y0)[c];
        let s10 = self.texel(x0 + 1, y0)[c];
        let s01 = self.texel(x0, y0 + 1)[c];
        let s11 = self.texel(x0 + 1, y0 + 1)[c];

        let a = s00 + (s10 - s00) * tx;
        let b = s01 + (s11 - s01) * tx;
        a + (b - a) * ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_returns_zero_for_unknown_texture() {
        let registry = TextureRegistry::new();
        assert_eq!(registry.sample("missing", TextureChannel::R, Vec2::ZERO), 0.0);
    }

    #[test]
    fn raster_samples_constant_fill() {
        let raster = RasterTexture::new(4, 4, Vec2::new(2.0, 2.0), Vec4::new(0.25, 0.5, 0.75, 1.0));
        assert!((raster.sample(TextureChannel::G, Vec2::new(0.3, -0.7)) - 0.5).abs() < 1e-6);
        assert!((raster.sample(TextureChannel::A, Vec2::new(9.0, 9.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn raster_interpolates_horizontal_gradient() {
        let raster = RasterTexture::from_fn(16, 1, Vec2::new(1.0, 1.0), |u, _| Vec4::splat(u));
        let left = raster.sample(TextureChannel::R, Vec2::new(-0.5, 0.0));
        let mid = raster.sample(TextureChannel::R, Vec2::new(0.0, 0.0));
        let right = raster.sample(TextureChannel::R, Vec2::new(0.5, 0.0));
        assert!(left < mid && mid < right);
        assert!((mid - 0.5).abs() < 0.05);
    }

    #[test]
    fn registry_registers_and_unregisters() {
        let mut registry = TextureRegistry::new();
        registry.register("cookie", RasterTexture::new(1, 1, Vec2::ONE, Vec4::ONE));
        assert!(registry.contains("cookie"));
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("cookie"));
        assert!(registry.is_empty());
    }
}
