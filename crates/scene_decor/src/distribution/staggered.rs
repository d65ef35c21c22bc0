//! Staggered concentric-ring tiling from two emitters.
//!
//! Two emitters sit at `(-1, -1)` and `(-1, 1)` in a normalized `[-1, 1]²` frame. Ring `i` of the
//! first emitter and ring `j` of the second have radii `i * step` and `j * step`, each widened by
//! `0.15 * step` whenever the other emitter's ring index is not a multiple of 3. Every pair of
//! rings that intersects contributes its intersection points inside the frame, which yields a
//! brick-like staggered pattern without any relaxation pass.
use glam::Vec2;
use mint::Vector2;
use rand::Rng as RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{sanitize_extent, Distribution, SamplePoint};
use crate::error::{Error, Result};

const EMITTER_A: Vec2 = Vec2::new(-1.0, -1.0);
const EMITTER_B: Vec2 = Vec2::new(-1.0, 1.0);
const STAGGER: f32 = 0.15;
const TANGENT_EPS: f32 = 1e-6;

/// Intersection of two circles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CircleIntersection {
    None,
    Tangent(Vec2),
    Secant(Vec2, Vec2),
}

/// Standard two-circle intersection: offset `a` along the center line to the radical line, then
/// the half-chord `h` perpendicular to it.
pub fn circle_intersections(c0: Vec2, r0: f32, c1: Vec2, r1: f32) -> CircleIntersection {
    let delta = c1 - c0;
    let d = delta.length();
    if d <= f32::EPSILON || d > r0 + r1 || d < (r0 - r1).abs() {
        return CircleIntersection::None;
    }
    let a = (d * d + r0 * r0 - r1 * r1) / (2.0 * d);
    let h2 = r0 * r0 - a * a;
    let dir = delta / d;
    let mid = c0 + dir * a;
    if h2 <= TANGENT_EPS {
        return CircleIntersection::Tangent(mid);
    }
    let h = h2.sqrt();
    let perp = Vec2::new(-dir.y, dir.x) * h;
    CircleIntersection::Secant(mid + perp, mid - perp)
}

/// Staggered concentric distribution.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct StaggeredConcentricDistribution {
    /// Ring spacing in the normalized `[-1, 1]²` frame.
    pub step_size: f32,
}

impl StaggeredConcentricDistribution {
    pub fn new(step_size: f32) -> Self {
        Self { step_size }
    }

    fn stagger(&self, other_ring: usize) -> f32 {
        if other_ring % 3 != 0 {
            STAGGER * self.step_size
        } else {
            0.0
        }
    }

    /// Intersection points in the `[-1, 1]²` frame.
    pub fn frame_points(&self) -> Vec<Vec2> {
        self.frame_points_limited(usize::MAX)
    }

    /// The first `limit` intersection points in the `[-1, 1]²` frame.
    pub fn frame_points_limited(&self, limit: usize) -> Vec<Vec2> {
        let step = self.step_size;
        if !(step.is_finite() && step > 0.0) || limit == 0 {
            return Vec::new();
        }
        // Farthest frame corner from either emitter is 2√2 away.
        let reach = 2.0 * std::f32::consts::SQRT_2;
        let rings = ((reach / step).ceil() as usize).saturating_add(1);
        // Emitters are 2 apart: rings meet only while |r0 - r1| <= 2 <= r0 + r1.
        let gap = (2.0 / step) as usize;
        let span = gap.saturating_add(2);

        let inside = |p: Vec2| p.cmpge(Vec2::NEG_ONE).all() && p.cmple(Vec2::ONE).all();
        let mut out = Vec::new();
        for i in 1..=rings {
            let lo = 1usize
                .max(i.saturating_sub(span))
                .max(gap.saturating_sub(i.saturating_add(1)));
            let hi = rings.min(i.saturating_add(span));
            for j in lo..=hi {
                if out.len() >= limit {
                    out.truncate(limit);
                    return out;
                }
                let r0 = i as f32 * step + self.stagger(j);
                let r1 = j as f32 * step + self.stagger(i);
                match circle_intersections(EMITTER_A, r0, EMITTER_B, r1) {
                    CircleIntersection::None => {}
                    CircleIntersection::Tangent(p) => {
                        if inside(p) {
                            out.push(p);
                        }
                    }
                    CircleIntersection::Secant(p, q) => {
                        if inside(p) {
                            out.push(p);
                        }
                        if inside(q) && p.distance_squared(q) > TANGENT_EPS {
                            out.push(q);
                        }
                    }
                }
            }
        }
        out.truncate(limit);
        out
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "staggered step_size must be positive and finite, got {}",
                self.step_size
            )));
        }
        Ok(())
    }
}

impl Distribution for StaggeredConcentricDistribution {
    fn distribute_limited(
        &self,
        extent: Vector2<f32>,
        _rng: &mut dyn RngCore,
        limit: usize,
    ) -> Vec<SamplePoint> {
        let extent = sanitize_extent(extent);
        let points: Vec<SamplePoint> = self
            .frame_points_limited(limit.max(1))
            .into_iter()
            .map(|p| SamplePoint::from_normalized((p + Vec2::ONE) * 0.5, extent))
            .collect();
        if points.is_empty() {
            return vec![SamplePoint::center(extent)];
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn tangent_circles_meet_once() {
        let hit = circle_intersections(EMITTER_A, 1.0, EMITTER_B, 1.0);
        assert_eq!(hit, CircleIntersection::Tangent(Vec2::new(-1.0, 0.0)));
    }

    #[test]
    fn separated_and_nested_circles_do_not_meet() {
        assert_eq!(
            circle_intersections(EMITTER_A, 0.5, EMITTER_B, 0.5),
            CircleIntersection::None
        );
        assert_eq!(
            circle_intersections(EMITTER_A, 5.0, EMITTER_B, 1.0),
            CircleIntersection::None
        );
    }

    #[test]
    fn secant_points_are_on_both_circles() {
        match circle_intersections(EMITTER_A, 1.5, EMITTER_B, 1.8) {
            CircleIntersection::Secant(p, q) => {
                for x in [p, q] {
                    assert!((x.distance(EMITTER_A) - 1.5).abs() < 1e-4);
                    assert!((x.distance(EMITTER_B) - 1.8).abs() < 1e-4);
                }
                assert!(p.distance(q) > 0.1);
            }
            other => panic!("expected two intersections, got {other:?}"),
        }
    }

    #[test]
    fn frame_points_stay_in_frame_and_are_unique() {
        let d = StaggeredConcentricDistribution::new(0.2);
        let pts = d.frame_points();
        assert!(pts.len() > 10);
        for (k, p) in pts.iter().enumerate() {
            assert!(p.x >= -1.0 && p.x <= 1.0 && p.y >= -1.0 && p.y <= 1.0);
            for q in &pts[k + 1..] {
                assert!(p.distance_squared(*q) > TANGENT_EPS);
            }
        }
    }

    #[test]
    fn limited_points_are_a_prefix_of_the_full_set() {
        let d = StaggeredConcentricDistribution::new(0.05);
        let all = d.frame_points();
        let first = d.frame_points_limited(25);
        assert!(all.len() > 25);
        assert_eq!(first.as_slice(), &all[..25]);
    }

    #[test]
    fn tiny_step_is_bounded_by_the_limit() {
        let mut rng = StdRng::seed_from_u64(0);
        let d = StaggeredConcentricDistribution::new(1e-4);
        let pts = d.distribute_limited(Vec2::new(3.0, 3.0).into(), &mut rng, 100);
        assert_eq!(pts.len(), 100);
    }

    #[test]
    fn oversized_step_falls_back_to_center() {
        let mut rng = StdRng::seed_from_u64(0);
        let d = StaggeredConcentricDistribution::new(50.0);
        let pts = d.distribute(Vec2::new(2.0, 2.0).into(), &mut rng);
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].local, Vec2::ZERO);
    }
}
