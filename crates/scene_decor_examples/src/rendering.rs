//! Top-down PNG rendering for the example binaries.
use std::collections::HashMap;
use std::path::Path;

use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};
use scene_decor::prelude::SpawnedInstanceRecord;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honoring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Marker drawn for one prefab.
#[derive(Clone, Copy, Debug)]
pub struct PrefabStyle {
    pub color: [u8; 3],
    pub radius: i32,
}

impl PrefabStyle {
    pub fn new(color: [u8; 3], radius: i32) -> Self {
        Self { color, radius }
    }
}

/// Image size and the world rectangle it shows.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub image_size: (u32, u32),
    pub world_min: Vec2,
    pub world_max: Vec2,
    pub background: [u8; 3],
    pub default_style: PrefabStyle,
    styles: HashMap<String, PrefabStyle>,
}

impl RenderConfig {
    pub fn new(image_size: (u32, u32), world_min: Vec2, world_max: Vec2) -> Self {
        Self {
            image_size,
            world_min,
            world_max,
            background: [245, 245, 245],
            default_style: PrefabStyle::new([30, 30, 30], 3),
            styles: HashMap::new(),
        }
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn with_style(mut self, prefab: &str, style: PrefabStyle) -> Self {
        self.styles.insert(prefab.to_string(), style);
        self
    }

    pub fn style(&self, prefab: &str) -> PrefabStyle {
        self.styles.get(prefab).copied().unwrap_or(self.default_style)
    }
}

/// RGB image addressed in world coordinates.
pub struct Canvas {
    image: RgbImage,
    world_min: Vec2,
    world_max: Vec2,
}

impl Canvas {
    pub fn new(config: &RenderConfig) -> Self {
        let (w, h) = config.image_size;
        Self {
            image: RgbImage::from_pixel(w.max(1), h.max(1), Rgb(config.background)),
            world_min: config.world_min,
            world_max: config.world_max,
        }
    }

    /// Pixel position of a world-space 2D point. Image rows grow downwards.
    fn to_pixel(&self, world: Vec2) -> (i32, i32) {
        let span = (self.world_max - self.world_min).max(Vec2::splat(f32::EPSILON));
        let t = (world - self.world_min) / span;
        let (w, h) = self.image.dimensions();
        (
            (t.x * (w as f32 - 1.0)).round() as i32,
            ((1.0 - t.y) * (h as f32 - 1.0)).round() as i32,
        )
    }

    fn put(&mut self, x: i32, y: i32, color: [u8; 3]) {
        let (w, h) = self.image.dimensions();
        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
            self.image.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }

    pub fn fill_circle(&mut self, center: Vec2, style: PrefabStyle) {
        let (cx, cy) = self.to_pixel(center);
        let r = style.radius.max(0);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.put(cx + dx, cy + dy, style.color);
                }
            }
        }
    }

    /// Outlines an axis-aligned world rectangle.
    pub fn stroke_rect(&mut self, min: Vec2, max: Vec2, color: [u8; 3]) {
        let (x0, y1) = self.to_pixel(min);
        let (x1, y0) = self.to_pixel(max);
        for x in x0..=x1 {
            self.put(x, y0, color);
            self.put(x, y1, color);
        }
        for y in y0..=y1 {
            self.put(x0, y, color);
            self.put(x1, y, color);
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.image.save(path.as_ref())?;
        info!("Wrote {}.", path.as_ref().display());
        Ok(())
    }
}

/// Renders 2D points with a single style.
pub fn render_points_to_png(
    points: &[Vec2],
    config: &RenderConfig,
    style: PrefabStyle,
    out_path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut canvas = Canvas::new(config);
    canvas.stroke_rect(config.world_min, config.world_max, [160, 160, 160]);
    for &p in points {
        canvas.fill_circle(p, style);
    }
    canvas.save(out_path)
}

/// Renders spawned instances seen from above (world X right, world -Z up).
pub fn render_instances_to_png<'a>(
    instances: impl IntoIterator<Item = &'a SpawnedInstanceRecord>,
    config: &RenderConfig,
    out_path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut canvas = Canvas::new(config);
    let mut records: Vec<&SpawnedInstanceRecord> = instances.into_iter().collect();
    // Deeper instances on top.
    records.sort_by_key(|r| r.depth);
    for record in records {
        let style = config.style(record.prefab.as_str());
        canvas.fill_circle(top_down(record.transform.position), style);
    }
    canvas.save(out_path)
}

/// Projects a world position onto the top-down image plane.
pub fn top_down(position: Vec3) -> Vec2 {
    Vec2::new(position.x, -position.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_corners_map_to_image_corners() {
        let config = RenderConfig::new((11, 11), Vec2::splat(-1.0), Vec2::splat(1.0));
        let canvas = Canvas::new(&config);
        assert_eq!(canvas.to_pixel(Vec2::new(-1.0, -1.0)), (0, 10));
        assert_eq!(canvas.to_pixel(Vec2::new(1.0, 1.0)), (10, 0));
        assert_eq!(canvas.to_pixel(Vec2::ZERO), (5, 5));
    }

    #[test]
    fn styles_fall_back_to_default() {
        let config = RenderConfig::new((8, 8), Vec2::ZERO, Vec2::ONE)
            .with_style("rock", PrefabStyle::new([1, 2, 3], 2));
        assert_eq!(config.style("rock").color, [1, 2, 3]);
        assert_eq!(config.style("moss").color, config.default_style.color);
    }

    #[test]
    fn circles_outside_the_canvas_are_clipped() {
        let config = RenderConfig::new((4, 4), Vec2::ZERO, Vec2::ONE);
        let mut canvas = Canvas::new(&config);
        canvas.fill_circle(Vec2::splat(10.0), PrefabStyle::new([0, 0, 0], 3));
        canvas.stroke_rect(Vec2::ZERO, Vec2::ONE, [0, 0, 0]);
    }
}
