use crate::Vec3;

/// Distance secondary rays are pushed off a surface to avoid self-intersection.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray in 3D space with an origin and a unit-length direction.
///
/// Rays are immutable once constructed; the constructor normalizes the
/// direction so intersection routines can rely on `t` being a distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Create a new ray. `direction` is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Create a ray leaving a surface point, nudged along `direction` by
    /// [`RAY_EPSILON`] so it does not re-hit the surface it starts on.
    pub fn spawn(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize();
        Self {
            origin: origin + direction * RAY_EPSILON,
            direction,
        }
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the unit direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 3.0, 0.0));

        assert_eq!(ray.origin(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ray.direction(), Vec3::Y);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_spawn_offsets_origin() {
        let ray = Ray::spawn(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));

        assert_eq!(ray.direction(), Vec3::Z);
        assert!((ray.origin().z - RAY_EPSILON).abs() < 1e-9);
    }
}
