//! Shapes paired with their material.

use crate::shape::{Hittable, Shape};
use crate::surface::Surface;
use std::sync::Arc;
use verdant_math::{Aabb, Interval, Ray, Vec3};

/// Record of a ray hitting a [`Primitive`].
///
/// A miss is `None` at every query site, so a record always carries a
/// material.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    /// Distance along the ray
    pub t: f32,
    /// Point of intersection
    pub point: Vec3,
    /// Outward geometric normal (not flipped toward the ray)
    pub normal: Vec3,
    /// Material at the intersection point
    pub surface: &'a Surface,
}

/// One shape and a shared material.
#[derive(Debug, Clone)]
pub struct Primitive {
    shape: Shape,
    surface: Arc<Surface>,
    bbox: Aabb,
}

impl Primitive {
    pub fn new(shape: impl Into<Shape>, surface: Arc<Surface>) -> Self {
        let shape = shape.into();
        let bbox = shape.bounding_box();
        Self {
            shape,
            surface,
            bbox,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    #[inline]
    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Closest hit within `ray_t`.
    #[inline]
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection<'_>> {
        self.shape.hit(ray, ray_t).map(|hit| Intersection {
            t: hit.t,
            point: ray.at(hit.t),
            normal: hit.normal,
            surface: &self.surface,
        })
    }
}
