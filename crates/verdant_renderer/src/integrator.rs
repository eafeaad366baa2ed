//! Radiance estimators.
//!
//! Every integrator answers the same question: how much light travels back
//! along `ray`. They differ in how they split the work between explicit
//! light sampling and material sampling.

use crate::primitive::Intersection;
use crate::sampler::{bernoulli, CosineHemisphere, Sampler};
use crate::scene::Scene;
use crate::surface::{Color, Surface};
use verdant_math::{Frame, Ray, Vec3, RAY_EPSILON};

/// Estimates incoming radiance along a ray.
pub trait Integrator: Send + Sync {
    fn radiance(&self, scene: &Scene, ray: &Ray, sampler: &mut Sampler) -> Color;
}

/// Local frame at a hit.
///
/// Non-delta surfaces get a normal flipped toward the viewer, so `v.z > 0`.
/// Dielectrics keep the outward normal because the sign of `v.z` tells them
/// whether the ray is entering or leaving.
struct ShadingPoint<'a> {
    point: Vec3,
    frame: Frame,
    v: Vec3,
    surface: &'a Surface,
}

impl<'a> ShadingPoint<'a> {
    fn new(ray: &Ray, isect: &Intersection<'a>) -> Self {
        let view = -ray.direction();
        let mut normal = isect.normal;
        if !isect.surface.is_delta() && normal.dot(view) < 0.0 {
            normal = -normal;
        }
        let frame = Frame::from_normal(normal);
        Self {
            point: isect.point,
            v: frame.to_local(view),
            frame,
            surface: isect.surface,
        }
    }

    /// Ray leaving the hit along local direction `l`.
    fn spawn(&self, l: Vec3) -> Ray {
        Ray::spawn(self.point, self.frame.to_world(l))
    }
}

/// Survival probability for the bounce at `depth`; `None` kills the path.
#[inline]
fn russian_roulette(
    sampler: &mut Sampler,
    depth: u32,
    min_bounces: u32,
    continue_probability: f32,
) -> Option<f32> {
    if depth < min_bounces || continue_probability >= 1.0 {
        return Some(1.0);
    }
    bernoulli(sampler, continue_probability).then_some(continue_probability)
}

/// Light reaching a non-delta hit straight from the point lights (one
/// shadow ray each) and the sky (`sky_samples` cosine-weighted shadow rays,
/// averaged). Delta surfaces get nothing here.
fn direct_lighting(scene: &Scene, sp: &ShadingPoint, sampler: &mut Sampler, sky_samples: u32) -> Color {
    if sp.surface.is_delta() {
        return Color::ZERO;
    }

    let mut lo = Color::ZERO;
    let normal = sp.frame.normal;

    for light in scene.point_lights() {
        let to_light = light.position - sp.point;
        let distance = to_light.length();
        if distance <= RAY_EPSILON {
            continue;
        }
        let dir = to_light / distance;
        let cos_theta = dir.dot(normal);
        if cos_theta <= 0.0 {
            continue;
        }
        let shadow = Ray::spawn(sp.point, dir);
        if scene.occluded(&shadow, distance - RAY_EPSILON) {
            continue;
        }
        lo += sp.surface.f(sp.frame.to_local(dir), sp.v) * light.irradiance * cos_theta;
    }

    if scene.sky_light().is_some() && sky_samples > 0 {
        let mut lo_sky = Color::ZERO;
        for _ in 0..sky_samples {
            let (pdf, l) = CosineHemisphere.sample(sampler);
            let shadow = sp.spawn(l);
            if scene.intersect(&shadow).is_none() {
                lo_sky += sp.surface.f(l, sp.v) * scene.sky_radiance(shadow.direction()) * l.z / pdf;
            }
        }
        lo += lo_sky / sky_samples as f32;
    }

    lo
}

/// The folded estimator: one material sample per bounce, no explicit light
/// sampling. Paths end on a miss (picking up the sky), a Russian-roulette
/// kill, or the optional depth cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathIntegrator {
    pub continue_probability: f32,
    pub min_bounces: u32,
    pub max_depth: Option<u32>,
}

impl Default for PathIntegrator {
    fn default() -> Self {
        Self {
            continue_probability: 0.9,
            min_bounces: 3,
            max_depth: None,
        }
    }
}

impl PathIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continue_probability(mut self, p: f32) -> Self {
        self.continue_probability = p;
        self
    }

    pub fn with_min_bounces(mut self, n: u32) -> Self {
        self.min_bounces = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<u32>) -> Self {
        self.max_depth = depth;
        self
    }

    fn trace(&self, scene: &Scene, ray: &Ray, sampler: &mut Sampler, depth: u32) -> Color {
        let q = match russian_roulette(sampler, depth, self.min_bounces, self.continue_probability) {
            Some(q) => q,
            None => return Color::ZERO,
        };

        let isect = match scene.intersect(ray) {
            Some(isect) => isect,
            None => return scene.sky_radiance(ray.direction()) / q,
        };
        if self.max_depth.is_some_and(|max| depth >= max) {
            return Color::ZERO;
        }

        let sp = ShadingPoint::new(ray, &isect);
        let sample = sp.surface.sample_f(sampler, sp.v);
        if sample.is_black() {
            return Color::ZERO;
        }

        let li = self.trace(scene, &sp.spawn(sample.direction), sampler, depth + 1);
        sample.weight() * li / q
    }
}

impl Integrator for PathIntegrator {
    fn radiance(&self, scene: &Scene, ray: &Ray, sampler: &mut Sampler) -> Color {
        self.trace(scene, ray, sampler, 0)
    }
}

/// Direct + indirect estimator.
///
/// At each non-delta hit, point lights are sampled with shadow rays and the
/// sky with `light_samples` cosine-weighted directions. The indirect bounce
/// then only gathers light reflected off other surfaces. Delta surfaces
/// skip explicit light sampling; their single sampled direction picks up
/// the sky when it escapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathTraceIntegrator {
    pub continue_probability: f32,
    pub min_bounces: u32,
    pub light_samples: u32,
    pub max_depth: Option<u32>,
}

impl Default for PathTraceIntegrator {
    fn default() -> Self {
        Self {
            continue_probability: 0.9,
            min_bounces: 3,
            light_samples: 8,
            max_depth: None,
        }
    }
}

impl PathTraceIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continue_probability(mut self, p: f32) -> Self {
        self.continue_probability = p;
        self
    }

    pub fn with_min_bounces(mut self, n: u32) -> Self {
        self.min_bounces = n;
        self
    }

    pub fn with_light_samples(mut self, n: u32) -> Self {
        self.light_samples = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<u32>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Outgoing radiance toward the viewer at a hit.
    fn shade(&self, scene: &Scene, sp: &ShadingPoint, sampler: &mut Sampler, depth: u32) -> Color {
        direct_lighting(scene, sp, sampler, self.light_samples) + self.indirect(scene, sp, sampler, depth)
    }

    fn indirect(&self, scene: &Scene, sp: &ShadingPoint, sampler: &mut Sampler, depth: u32) -> Color {
        if self.max_depth.is_some_and(|max| depth >= max) {
            return Color::ZERO;
        }
        let q = match russian_roulette(sampler, depth, self.min_bounces, self.continue_probability) {
            Some(q) => q,
            None => return Color::ZERO,
        };

        let sample = sp.surface.sample_f(sampler, sp.v);
        if sample.is_black() {
            return Color::ZERO;
        }

        let next_ray = sp.spawn(sample.direction);
        let li = match scene.intersect(&next_ray) {
            Some(next) => {
                let next_sp = ShadingPoint::new(&next_ray, &next);
                self.shade(scene, &next_sp, sampler, depth + 1)
            }
            // Non-delta surfaces already gathered the sky in `direct`
            None if sp.surface.is_delta() => scene.sky_radiance(next_ray.direction()),
            None => Color::ZERO,
        };

        sample.weight() * li / q
    }
}

impl Integrator for PathTraceIntegrator {
    fn radiance(&self, scene: &Scene, ray: &Ray, sampler: &mut Sampler) -> Color {
        match scene.intersect(ray) {
            Some(isect) => {
                let sp = ShadingPoint::new(ray, &isect);
                self.shade(scene, &sp, sampler, 0)
            }
            None => scene.sky_radiance(ray.direction()),
        }
    }
}

/// One material bounce off the first hit, looking only for the sky.
///
/// Cheap and noisy, handy for checking geometry and materials.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectLightingIntegrator;

impl Integrator for DirectLightingIntegrator {
    fn radiance(&self, scene: &Scene, ray: &Ray, sampler: &mut Sampler) -> Color {
        let isect = match scene.intersect(ray) {
            Some(isect) => isect,
            None => return scene.sky_radiance(ray.direction()),
        };

        let sp = ShadingPoint::new(ray, &isect);
        let sample = sp.surface.sample_f(sampler, sp.v);
        if sample.is_black() {
            return Color::ZERO;
        }

        let bounce = sp.spawn(sample.direction);
        match scene.intersect(&bounce) {
            Some(_) => Color::ZERO,
            None => sample.weight() * scene.sky_radiance(bounce.direction()),
        }
    }
}

/// Iterative path tracer with a running throughput and a fixed bounce cap.
///
/// Non-delta hits gather point lights and `light_samples` sky directions
/// explicitly. An escaping ray only adds the sky when it left the camera or
/// a delta surface, since every other hit already sampled it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KajiyaIntegrator {
    pub light_samples: u32,
    pub max_bounces: u32,
}

impl Default for KajiyaIntegrator {
    fn default() -> Self {
        Self {
            light_samples: 4,
            max_bounces: 5,
        }
    }
}

impl KajiyaIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_light_samples(mut self, n: u32) -> Self {
        self.light_samples = n;
        self
    }

    pub fn with_max_bounces(mut self, n: u32) -> Self {
        self.max_bounces = n;
        self
    }
}

impl Integrator for KajiyaIntegrator {
    fn radiance(&self, scene: &Scene, ray: &Ray, sampler: &mut Sampler) -> Color {
        let mut ray = *ray;
        let mut beta = Color::ONE;
        let mut lo = Color::ZERO;
        let mut specular_bounce = false;

        for bounce in 0..=self.max_bounces {
            let isect = match scene.intersect(&ray) {
                Some(isect) => isect,
                None => {
                    if bounce == 0 || specular_bounce {
                        lo += beta * scene.sky_radiance(ray.direction());
                    }
                    break;
                }
            };

            let sp = ShadingPoint::new(&ray, &isect);
            lo += beta * direct_lighting(scene, &sp, sampler, self.light_samples);

            let sample = sp.surface.sample_f(sampler, sp.v);
            beta *= sample.weight();
            if beta == Color::ZERO {
                break;
            }
            specular_bounce = sp.surface.is_delta();
            ray = sp.spawn(sample.direction);
        }

        lo
    }
}
