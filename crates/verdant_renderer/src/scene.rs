//! Scene description: primitives, lights, and sky.

use crate::bvh::Bvh;
use crate::environment::EnvironmentMap;
use crate::primitive::{Intersection, Primitive};
use crate::sphere::Sphere;
use crate::surface::{Color, Surface};
use crate::triangle::Triangle;
use std::sync::Arc;
use verdant_math::{Interval, Ray, Vec3};

/// An infinitely small light with no falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub irradiance: Color,
}

/// Light arriving from infinitely far away in every direction a ray escapes.
#[derive(Debug, Clone)]
pub enum SkyLight {
    Constant(Color),
    Environment(Arc<EnvironmentMap>),
}

impl SkyLight {
    pub fn radiance(&self, dir: Vec3) -> Color {
        match self {
            SkyLight::Constant(c) => *c,
            SkyLight::Environment(map) => map.radiance(dir),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
    point_lights: Vec<PointLight>,
    sky_light: Option<SkyLight>,
    bvh: Option<Bvh>,
}

impl Scene {
    /// An empty scene with no sky. Every ray misses and sees black.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive. Any BVH built earlier is discarded; call
    /// [`Scene::build_bvh`] again once the scene is complete.
    pub fn add_primitive(&mut self, primitive: Primitive) {
        if self.bvh.take().is_some() {
            log::debug!("Scene modified, dropping stale BVH");
        }
        self.primitives.push(primitive);
    }

    pub fn add_point_light(&mut self, position: Vec3, irradiance: Color) {
        self.point_lights.push(PointLight {
            position,
            irradiance,
        });
    }

    pub fn set_sky_light(&mut self, sky_light: Option<SkyLight>) {
        self.sky_light = sky_light;
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn sky_light(&self) -> Option<&SkyLight> {
        self.sky_light.as_ref()
    }

    pub fn has_bvh(&self) -> bool {
        self.bvh.is_some()
    }

    /// Radiance of the sky seen along `dir`; black without a sky.
    pub fn sky_radiance(&self, dir: Vec3) -> Color {
        self.sky_light
            .as_ref()
            .map_or(Color::ZERO, |sky| sky.radiance(dir))
    }

    /// Build the acceleration structure over the current primitives.
    pub fn build_bvh(&mut self, leaf_size: usize) {
        self.bvh = Some(Bvh::build(&self.primitives, leaf_size));
    }

    /// Closest hit along the ray.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        self.intersect_within(ray, Interval::POSITIVE)
    }

    /// Closest hit with `t` inside `ray_t`. Uses the BVH when one has been
    /// built and a linear scan otherwise; both give the same answer.
    pub fn intersect_within(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection<'_>> {
        if let Some(bvh) = &self.bvh {
            return bvh.intersect(&self.primitives, ray, ray_t);
        }

        let mut closest = None;
        let mut closest_t = ray_t.max;
        for primitive in &self.primitives {
            if let Some(hit) = primitive.intersect(ray, ray_t.with_max(closest_t)) {
                closest_t = hit.t;
                closest = Some(hit);
            }
        }
        closest
    }

    /// True if anything blocks the ray before `max_t`.
    pub fn occluded(&self, ray: &Ray, max_t: f32) -> bool {
        self.intersect_within(ray, Interval::new(0.0, max_t)).is_some()
    }

    /// The default scene: a row of six tinted glass spheres over a green
    /// floor, in front of a white wall, under a constant white sky.
    pub fn demo() -> Self {
        let mut scene = Scene::new();
        scene.set_sky_light(Some(SkyLight::Constant(Color::ONE)));

        for i in 0..6 {
            let fi = i as f32;
            let surface = if i == 2 {
                Surface::glass(Color::ONE, 1.5)
            } else {
                let tint = Color::new(fi.sin().abs(), fi.cos().abs(), (1.0 - fi.sin()).abs());
                Surface::glass(tint, 1.1 + 0.1 * fi)
            };
            let sphere = Sphere::new(Vec3::new(-4.0 + 2.0 * fi, 0.0, 0.0), 1.0);
            scene.add_primitive(Primitive::new(sphere, Arc::new(surface)));
        }

        let (xl, yl, zl) = (4.0, 1.0, 4.0);
        let green = Arc::new(Surface::lambert(Color::new(0.2, 1.0, 0.2)));
        let white = Arc::new(Surface::lambert(Color::splat(0.9)));

        // Floor, facing +Y
        let floor = [
            Triangle::new(Vec3::new(-xl, -yl, zl), Vec3::new(xl, -yl, -zl), Vec3::new(-xl, -yl, -zl)),
            Triangle::new(Vec3::new(-xl, -yl, zl), Vec3::new(xl, -yl, zl), Vec3::new(xl, -yl, -zl)),
        ];
        // Back wall, facing +Z
        let wall = [
            Triangle::new(Vec3::new(-xl, -yl, -zl), Vec3::new(xl, yl, -zl), Vec3::new(-xl, yl, -zl)),
            Triangle::new(Vec3::new(-xl, -yl, -zl), Vec3::new(xl, -yl, -zl), Vec3::new(xl, yl, -zl)),
        ];
        for tri in floor {
            scene.add_primitive(Primitive::new(tri, green.clone()));
        }
        for tri in wall {
            scene.add_primitive(Primitive::new(tri, white.clone()));
        }

        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_LEAF_SIZE;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_empty_scene_misses_everything() {
        let mut scene = Scene::new();
        scene.build_bvh(DEFAULT_LEAF_SIZE);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, -0.2, 1.0));
        assert!(scene.intersect(&ray).is_none());
        assert_eq!(scene.sky_radiance(ray.direction()), Color::ZERO);
    }

    #[test]
    fn test_sky_radiance() {
        let mut scene = Scene::new();
        scene.set_sky_light(Some(SkyLight::Constant(Color::new(0.1, 0.2, 0.3))));
        assert_eq!(scene.sky_radiance(Vec3::Y), Color::new(0.1, 0.2, 0.3));

        let map = EnvironmentMap::uniform(Color::splat(2.0));
        scene.set_sky_light(Some(SkyLight::Environment(Arc::new(map))));
        assert_eq!(scene.sky_radiance(-Vec3::Z), Color::splat(2.0));
    }

    #[test]
    fn test_demo_layout() {
        let scene = Scene::demo();
        assert_eq!(scene.primitives().len(), 10);
        assert!(scene.point_lights().is_empty());
        assert!(matches!(scene.sky_light(), Some(SkyLight::Constant(_))));

        // Looking down the row from the camera hits the white glass sphere
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        let hit = scene.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert_eq!(*hit.surface, Surface::glass(Color::ONE, 1.5));

        // Looking straight down between spheres hits the green floor
        let ray = Ray::new(Vec3::new(-3.0, 5.0, 2.0), -Vec3::Y);
        let hit = scene.intersect(&ray).unwrap();
        assert!((hit.point.y + 1.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_bvh_and_linear_scan_agree() {
        let mut linear = Scene::demo();
        linear.add_point_light(Vec3::new(0.0, 3.0, 0.0), Color::ONE);
        let mut accelerated = linear.clone();
        accelerated.build_bvh(2);
        assert!(accelerated.has_bvh() && !linear.has_bvh());

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..300 {
            let origin = Vec3::new(
                rng.gen_range(-6.0..6.0),
                rng.gen_range(-2.0..4.0),
                rng.gen_range(-2.0..8.0),
            );
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            let ray = Ray::new(origin, dir);
            let a = linear.intersect(&ray).map(|h| (h.t, h.surface.clone()));
            let b = accelerated.intersect(&ray).map(|h| (h.t, h.surface.clone()));
            match (a, b) {
                (None, None) => {}
                (Some((ta, sa)), Some((tb, sb))) => {
                    assert!((ta - tb).abs() < 1e-5);
                    assert_eq!(sa, sb);
                }
                (a, b) => panic!("mismatch for {:?}: {:?} vs {:?}", ray, a, b),
            }
        }
    }

    #[test]
    fn test_adding_primitive_drops_bvh() {
        let mut scene = Scene::demo();
        scene.build_bvh(DEFAULT_LEAF_SIZE);
        scene.add_primitive(Primitive::new(
            Sphere::new(Vec3::new(0.0, 5.0, 0.0), 1.0),
            Arc::new(Surface::lambert(Color::ONE)),
        ));
        assert!(!scene.has_bvh());

        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), -Vec3::Y);
        assert!((scene.intersect(&ray).unwrap().t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_occlusion() {
        let scene = Scene::demo();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        assert!(scene.occluded(&ray, 10.0));
        assert!(!scene.occluded(&ray, 3.0));
    }
}
