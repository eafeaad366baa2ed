//! Random streams and the hemisphere distributions built on them.
//!
//! Every worker owns its own [`Sampler`]; nothing here is shared between
//! threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use verdant_math::Vec3;

/// A seedable stream of uniform values in [0, 1).
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Independent stream `stream` derived from a base seed, e.g. one per tile.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        Self::new(seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Next uniform value in [0, 1).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

/// Returns true with probability `p`.
#[inline]
pub fn bernoulli(sampler: &mut Sampler, p: f32) -> bool {
    sampler.next_f32() < p
}

/// Uniform directions over the +Z hemisphere.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformHemisphere;

impl UniformHemisphere {
    /// Returns the pdf and a unit direction with z in (0, 1].
    pub fn sample(&self, sampler: &mut Sampler) -> (f32, Vec3) {
        let phi = 2.0 * PI * sampler.next_f32();
        let z = 1.0 - sampler.next_f32();
        let r = (1.0 - z * z).max(0.0).sqrt();
        (self.pdf(Vec3::Z), Vec3::new(r * phi.cos(), r * phi.sin(), z))
    }

    pub fn pdf(&self, _direction: Vec3) -> f32 {
        1.0 / (2.0 * PI)
    }
}

/// Cosine-weighted directions over the +Z hemisphere, pdf = cos(theta) / pi.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineHemisphere;

impl CosineHemisphere {
    /// Returns the pdf and a unit direction with z in (0, 1], so the pdf is
    /// never zero.
    pub fn sample(&self, sampler: &mut Sampler) -> (f32, Vec3) {
        let phi = 2.0 * PI * sampler.next_f32();
        let u = sampler.next_f32();
        let z = (1.0 - u).sqrt();
        let r = u.sqrt();
        let direction = Vec3::new(r * phi.cos(), r * phi.sin(), z);
        (self.pdf(direction), direction)
    }

    /// `direction` must be unit length.
    pub fn pdf(&self, direction: Vec3) -> f32 {
        direction.z.max(0.0) / PI
    }
}
