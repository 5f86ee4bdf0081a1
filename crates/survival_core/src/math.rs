//! World-space math helpers.
//!
//! The world is y-up. Gameplay distances (sector reach, AI ranges,
//! knockback) are measured on the horizontal XZ plane; ray and circle
//! queries use full 3D distance.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Squared length below which a direction is treated as degenerate.
pub const DEGENERATE_LENGTH_SQUARED: f64 = 1e-12;

/// Drop the vertical component of a vector.
#[inline]
#[must_use]
pub fn horizontal(v: DVec3) -> DVec3 {
    DVec3::new(v.x, 0.0, v.z)
}

/// Distance between two points ignoring height.
#[inline]
#[must_use]
pub fn horizontal_distance(a: DVec3, b: DVec3) -> f64 {
    horizontal(b - a).length()
}

/// Angle in radians between two directions.
///
/// Returns `None` when either vector is degenerate.
#[must_use]
pub fn angle_between(a: DVec3, b: DVec3) -> Option<f64> {
    if a.length_squared() < DEGENERATE_LENGTH_SQUARED || b.length_squared() < DEGENERATE_LENGTH_SQUARED
    {
        return None;
    }
    let dot = a.normalize().dot(b.normalize()).clamp(-1.0, 1.0);
    Some(dot.acos())
}

/// Horizontal unit direction from `from` towards `to`.
///
/// Returns `None` when the two points share a vertical axis.
#[must_use]
pub fn horizontal_direction(from: DVec3, to: DVec3) -> Option<DVec3> {
    let delta = horizontal(to - from);
    if delta.length_squared() < DEGENERATE_LENGTH_SQUARED {
        None
    } else {
        Some(delta.normalize())
    }
}

/// Step `position` horizontally towards `target` by at most `max_step`.
///
/// Does nothing when already within `dead_zone` of the target and never
/// overshoots. Height is left untouched.
#[must_use]
pub fn step_towards(position: DVec3, target: DVec3, max_step: f64, dead_zone: f64) -> DVec3 {
    let delta = horizontal(target - position);
    let distance = delta.length();
    if distance < dead_zone || max_step <= 0.0 {
        return position;
    }
    if max_step >= distance {
        return DVec3::new(target.x, position.y, target.z);
    }
    position + delta / distance * max_step
}

// ============================================================================
// Rays
// ============================================================================

/// A half-line with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Ray origin.
    pub origin: DVec3,
    /// Unit direction.
    pub direction: DVec3,
}

impl Ray {
    /// Create a ray, normalizing `direction`.
    ///
    /// A degenerate direction falls back to +Z.
    #[must_use]
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        let direction = if direction.length_squared() < DEGENERATE_LENGTH_SQUARED {
            DVec3::Z
        } else {
            direction.normalize()
        };
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

// ============================================================================
// Axis-aligned bounds
// ============================================================================

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb {
    /// Box centered on `center` with the given half extents.
    #[must_use]
    pub fn from_center(center: DVec3, half_extents: DVec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Whether the point lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Entry distance of `ray` into the box, if it hits within `max_distance`.
    ///
    /// Slab test. A ray starting inside the box hits at distance 0.
    #[must_use]
    pub fn ray_intersection(&self, ray: &Ray, max_distance: f64) -> Option<f64> {
        let mut t_min = 0.0_f64;
        let mut t_max = max_distance;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < f64::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_distance_ignores_height() {
        let a = DVec3::new(0.0, 0.0, 0.0);
        let b = DVec3::new(3.0, 50.0, 4.0);
        assert!((horizontal_distance(a, b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_between_right_angle() {
        let angle = angle_between(DVec3::X, DVec3::Z).unwrap();
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_angle_between_degenerate() {
        assert!(angle_between(DVec3::ZERO, DVec3::X).is_none());
    }

    #[test]
    fn test_step_towards_no_overshoot() {
        let start = DVec3::new(0.0, 1.0, 0.0);
        let target = DVec3::new(1.0, 0.0, 0.0);
        let moved = step_towards(start, target, 5.0, 0.1);
        assert_eq!(moved, DVec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_step_towards_partial() {
        let moved = step_towards(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0), 2.0, 0.1);
        assert!((moved.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_step_towards_dead_zone() {
        let start = DVec3::ZERO;
        let moved = step_towards(start, DVec3::new(0.05, 0.0, 0.0), 2.0, 0.1);
        assert_eq!(moved, start);
    }

    #[test]
    fn test_ray_hits_box_in_front() {
        let aabb = Aabb::from_center(DVec3::new(0.0, 0.0, 5.0), DVec3::splat(0.5));
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        let t = aabb.ray_intersection(&ray, 10.0).unwrap();
        assert!((t - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_ray_misses_box_beyond_range() {
        let aabb = Aabb::from_center(DVec3::new(0.0, 0.0, 5.0), DVec3::splat(0.5));
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        assert!(aabb.ray_intersection(&ray, 4.0).is_none());
    }

    #[test]
    fn test_ray_misses_box_behind() {
        let aabb = Aabb::from_center(DVec3::new(0.0, 0.0, -5.0), DVec3::splat(0.5));
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        assert!(aabb.ray_intersection(&ray, 10.0).is_none());
    }

    #[test]
    fn test_ray_starting_inside_hits_at_zero() {
        let aabb = Aabb::from_center(DVec3::ZERO, DVec3::splat(1.0));
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        assert_eq!(aabb.ray_intersection(&ray, 10.0), Some(0.0));
    }

    #[test]
    fn test_ray_degenerate_direction_defaults_forward() {
        let ray = Ray::new(DVec3::ZERO, DVec3::ZERO);
        assert_eq!(ray.direction, DVec3::Z);
    }
}
