//! Geometry-only intersection.

use crate::{LineSegment, Sphere, Triangle};
use verdant_math::{Aabb, Interval, Ray, Vec3};

/// Result of a ray hitting bare geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Distance along the ray
    pub t: f32,
    /// Unit geometric normal. Points outward for closed shapes; for a
    /// triangle it follows the winding order. Never flipped toward the ray.
    pub normal: Vec3,
}

/// Trait for geometry that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Closest hit with `t` strictly inside `ray_t`.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit>;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

/// The closed set of supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
    LineSegment(LineSegment),
}

impl Hittable for Shape {
    #[inline]
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit> {
        match self {
            Shape::Sphere(s) => s.hit(ray, ray_t),
            Shape::Triangle(t) => t.hit(ray, ray_t),
            Shape::LineSegment(l) => l.hit(ray, ray_t),
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Sphere(s) => s.bounding_box(),
            Shape::Triangle(t) => t.bounding_box(),
            Shape::LineSegment(l) => l.bounding_box(),
        }
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Self {
        Shape::Sphere(s)
    }
}

impl From<Triangle> for Shape {
    fn from(t: Triangle) -> Self {
        Shape::Triangle(t)
    }
}

impl From<LineSegment> for Shape {
    fn from(l: LineSegment) -> Self {
        Shape::LineSegment(l)
    }
}
