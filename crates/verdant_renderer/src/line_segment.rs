//! Thick line segments, intersected as open cylinders.

use crate::shape::{Hittable, ShapeHit};
use verdant_math::{Aabb, Interval, Ray, Vec3};

/// Below this squared perpendicular speed the ray runs along the axis.
const PARALLEL_EPSILON: f32 = 1e-10;

/// A cylinder of `radius` around the segment `origin .. origin + dir`.
///
/// Only the curved side is intersected; the end caps are open.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    origin: Vec3,
    dir: Vec3,
    radius: f32,
    bbox: Aabb,
}

impl LineSegment {
    pub fn new(origin: Vec3, dir: Vec3, radius: f32) -> Self {
        let radius = radius.max(0.0);
        let r = Vec3::splat(radius);
        let end = origin + dir;
        let bbox = Aabb::from_points(origin.min(end) - r, origin.max(end) + r);
        Self {
            origin,
            dir,
            radius,
            bbox,
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn end(&self) -> Vec3 {
        self.origin + self.dir
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Hittable for LineSegment {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit> {
        let length = self.dir.length();
        if self.radius <= 0.0 || length <= 0.0 {
            return None;
        }
        let axis = self.dir / length;

        // Project ray and offset onto the plane perpendicular to the axis
        let oc = ray.origin() - self.origin;
        let d = ray.direction();
        let d_perp = d - axis * d.dot(axis);
        let oc_perp = oc - axis * oc.dot(axis);

        let a = d_perp.length_squared();
        if a < PARALLEL_EPSILON {
            return None;
        }
        let h = d_perp.dot(oc_perp);
        let c = oc_perp.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        for t in [(-h - sqrtd) / a, (-h + sqrtd) / a] {
            if !ray_t.surrounds(t) {
                continue;
            }
            let p = ray.at(t);
            let s = (p - self.origin).dot(axis);
            if (0.0..=length).contains(&s) {
                let normal = (p - self.origin - axis * s) / self.radius;
                return Some(ShapeHit {
                    t,
                    normal: normal.normalize_or_zero(),
                });
            }
        }
        None
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_rod() -> LineSegment {
        LineSegment::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 0.5)
    }

    #[test]
    fn test_hits_side() {
        let rod = vertical_rod();
        let ray = Ray::new(Vec3::new(0.0, 1.0, 5.0), -Vec3::Z);

        let hit = rod.hit(&ray, Interval::POSITIVE).unwrap();
        assert!((hit.t - 4.5).abs() < 1e-4);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_misses_beyond_ends() {
        let rod = vertical_rod();
        let above = Ray::new(Vec3::new(0.0, 2.5, 5.0), -Vec3::Z);
        let below = Ray::new(Vec3::new(0.0, -0.5, 5.0), -Vec3::Z);
        assert!(rod.hit(&above, Interval::POSITIVE).is_none());
        assert!(rod.hit(&below, Interval::POSITIVE).is_none());
    }

    #[test]
    fn test_misses_to_the_side() {
        let rod = vertical_rod();
        let ray = Ray::new(Vec3::new(0.6, 1.0, 5.0), -Vec3::Z);
        assert!(rod.hit(&ray, Interval::POSITIVE).is_none());
    }

    #[test]
    fn test_ray_along_axis_misses() {
        let rod = vertical_rod();
        let ray = Ray::new(Vec3::new(0.0, -3.0, 0.0), Vec3::Y);
        assert!(rod.hit(&ray, Interval::POSITIVE).is_none());
    }

    #[test]
    fn test_open_end_shows_far_wall() {
        // A slanted ray entering the open end hits the inside wall
        let rod = LineSegment::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -4.0), 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.3, 0.0, -1.0));

        let hit = rod.hit(&ray, Interval::POSITIVE).unwrap();
        let p = ray.at(hit.t);
        assert!((p.x - 1.0).abs() < 1e-4);
        assert!(p.z < 0.0 && p.z > -4.0);
    }

    #[test]
    fn test_bounding_box_contains_tube() {
        let rod = vertical_rod();
        let bbox = rod.bounding_box();
        assert!(bbox.x.contains(-0.5) && bbox.x.contains(0.5));
        assert!(bbox.y.contains(0.0) && bbox.y.contains(2.0));
    }
}
