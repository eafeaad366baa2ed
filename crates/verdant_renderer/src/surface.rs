//! Surface materials.
//!
//! A closed set of kinds behind one enum, so evaluating a hit is a single
//! `match` with no dynamic dispatch. All directions are in the local shading
//! frame where the normal is +Z; `v` points from the surface toward the
//! viewer and sampled directions point away from the surface.

use crate::fresnel::{fr_dielectric, reflect, refract};
use crate::sampler::{CosineHemisphere, Sampler};
use std::f32::consts::PI;
use verdant_math::Vec3;

/// Color type alias (linear RGB radiance or reflectance)
pub type Color = Vec3;

/// Indices of refraction on the outside (`incident`) and inside
/// (`transmitted`) of a dielectric interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ior {
    pub incident: f32,
    pub transmitted: f32,
}

impl Ior {
    /// Interface between air and a medium of index `eta`.
    pub fn new(eta: f32) -> Self {
        Self {
            incident: 1.0,
            transmitted: eta,
        }
    }

    /// `(eta on v's side, eta on the far side)`.
    #[inline]
    fn oriented(&self, v: Vec3) -> (f32, f32) {
        if v.z > 0.0 {
            (self.incident, self.transmitted)
        } else {
            (self.transmitted, self.incident)
        }
    }
}

/// Discriminant of [`Surface`], for logging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Lambert,
    Reflect,
    Refract,
    Glass,
    Specular,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Ideal diffuse reflector.
    Lambert { albedo: Color },
    /// Fresnel-weighted mirror.
    Reflect { albedo: Color, ior: Ior },
    /// Fresnel-weighted transmission only.
    Refract { albedo: Color, ior: Ior },
    /// Reflection or transmission, picked by Fresnel reflectance.
    Glass { albedo: Color, ior: Ior },
    /// Diffuse base under a mirror coat, picked by Fresnel reflectance.
    Specular { albedo: Color, ior: Ior },
}

/// A direction drawn from a surface and the terms of its estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// BRDF (or Fresnel-weighted delta) value for `direction`.
    pub value: Color,
    /// Sampled direction in the local frame, unit length.
    pub direction: Vec3,
    pub pdf: f32,
}

impl SurfaceSample {
    fn delta(value: Color, direction: Vec3) -> Self {
        Self {
            value,
            direction,
            pdf: 1.0,
        }
    }

    /// True if this sample cannot carry any light.
    pub fn is_black(&self) -> bool {
        self.pdf <= 0.0 || self.value == Color::ZERO
    }

    /// `value * |cos(theta)| / pdf`, the throughput of one path step.
    pub fn weight(&self) -> Color {
        // Grazing delta samples carry value / 0 and contribute nothing
        if self.is_black() || self.direction.z == 0.0 {
            return Color::ZERO;
        }
        self.value * self.direction.z.abs() / self.pdf
    }
}

impl Surface {
    pub fn lambert(albedo: Color) -> Self {
        Surface::Lambert { albedo }
    }

    pub fn reflect(albedo: Color, eta: f32) -> Self {
        Surface::Reflect {
            albedo,
            ior: Ior::new(eta),
        }
    }

    pub fn refract(albedo: Color, eta: f32) -> Self {
        Surface::Refract {
            albedo,
            ior: Ior::new(eta),
        }
    }

    pub fn glass(albedo: Color, eta: f32) -> Self {
        Surface::Glass {
            albedo,
            ior: Ior::new(eta),
        }
    }

    pub fn specular(albedo: Color, eta: f32) -> Self {
        Surface::Specular {
            albedo,
            ior: Ior::new(eta),
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Lambert { .. } => SurfaceKind::Lambert,
            Surface::Reflect { .. } => SurfaceKind::Reflect,
            Surface::Refract { .. } => SurfaceKind::Refract,
            Surface::Glass { .. } => SurfaceKind::Glass,
            Surface::Specular { .. } => SurfaceKind::Specular,
        }
    }

    pub fn albedo(&self) -> Color {
        match self {
            Surface::Lambert { albedo }
            | Surface::Reflect { albedo, .. }
            | Surface::Refract { albedo, .. }
            | Surface::Glass { albedo, .. }
            | Surface::Specular { albedo, .. } => *albedo,
        }
    }

    /// True when the scattering distribution is a Dirac delta, so [`Surface::f`]
    /// is zero and light only arrives through [`Surface::sample_f`].
    pub fn is_delta(&self) -> bool {
        !matches!(self, Surface::Lambert { .. })
    }

    /// Evaluate the BRDF for light arriving from `l` toward `v`.
    pub fn f(&self, l: Vec3, v: Vec3) -> Color {
        match self {
            Surface::Lambert { albedo } if l.z * v.z > 0.0 => *albedo / PI,
            _ => Color::ZERO,
        }
    }

    /// Draw an incident direction for viewer direction `v`.
    pub fn sample_f(&self, sampler: &mut Sampler, v: Vec3) -> SurfaceSample {
        match self {
            Surface::Lambert { albedo } => sample_lambert(*albedo, sampler, v),
            Surface::Reflect { albedo, ior } => {
                // A mirror has no inside, so both faces see the same interface
                let l = reflect(v);
                let fr = fr_dielectric(v.z.abs(), ior.incident, ior.transmitted);
                SurfaceSample::delta(*albedo * fr / l.z.abs(), l)
            }
            Surface::Refract { albedo, ior } => {
                let (eta_a, eta_b) = ior.oriented(v);
                match refract(v, eta_a / eta_b) {
                    Some(l) => {
                        let fr = fr_dielectric(v.z.abs(), eta_a, eta_b);
                        SurfaceSample::delta(*albedo * (1.0 - fr) / l.z.abs(), l)
                    }
                    // Total internal reflection: nothing is transmitted
                    None => SurfaceSample::delta(Color::ZERO, reflect(v)),
                }
            }
            Surface::Glass { albedo, ior } => {
                let (eta_a, eta_b) = ior.oriented(v);
                let k_reflect = fr_dielectric(v.z.abs(), eta_a, eta_b);
                if sampler.next_f32() < k_reflect {
                    let l = reflect(v);
                    return SurfaceSample::delta(*albedo / l.z.abs(), l);
                }
                match refract(v, eta_a / eta_b) {
                    Some(l) => SurfaceSample::delta(*albedo / l.z.abs(), l),
                    None => SurfaceSample::delta(Color::ZERO, reflect(v)),
                }
            }
            Surface::Specular { albedo, ior } => {
                let (eta_a, eta_b) = ior.oriented(v);
                let k_reflect = fr_dielectric(v.z.abs(), eta_a, eta_b);
                if sampler.next_f32() < k_reflect {
                    let l = reflect(v);
                    SurfaceSample::delta(*albedo / l.z.abs(), l)
                } else {
                    sample_lambert(*albedo, sampler, v)
                }
            }
        }
    }
}

/// Cosine-weighted sample on `v`'s side: value * cos / pdf == albedo.
fn sample_lambert(albedo: Color, sampler: &mut Sampler, v: Vec3) -> SurfaceSample {
    let (pdf, mut l) = CosineHemisphere.sample(sampler);
    if v.z < 0.0 {
        l.z = -l.z;
    }
    SurfaceSample {
        value: albedo / PI,
        direction: l,
        pdf,
    }
}
