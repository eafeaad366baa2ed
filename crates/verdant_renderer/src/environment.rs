//! Equirectangular environment maps for image-based sky lighting.

use crate::error::{RenderError, RenderResult};
use crate::surface::Color;
use std::f32::consts::PI;
use std::path::Path;
use verdant_math::Vec3;

/// A latitude/longitude radiance image.
///
/// Rows run from +Y (top) to -Y (bottom); columns sweep the azimuth
/// `atan2(z, x) + pi` from 0 to 2*pi.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl EnvironmentMap {
    /// Wrap already-decoded linear radiance, row-major.
    pub fn new(width: u32, height: u32, pixels: Vec<Color>) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidEnvironmentMap(format!(
                "empty image ({}x{})",
                width, height
            )));
        }
        if pixels.len() != width as usize * height as usize {
            return Err(RenderError::InvalidEnvironmentMap(format!(
                "expected {} pixels for {}x{}, got {}",
                width as usize * height as usize,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-color map, mostly useful in tests.
    pub fn uniform(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
        }
    }

    /// Load a floating-point image (Radiance `.hdr`, OpenEXR, ...) from disk.
    /// 8-bit formats are accepted too and come back in [0, 1].
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)?.into_rgb32f();
        let (width, height) = img.dimensions();

        let pixels = img
            .pixels()
            .map(|p| Color::new(p[0], p[1], p[2]))
            .collect();

        log::info!("Loaded environment map {} ({}x{})", path.display(), width, height);
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Look up by polar angle `theta` in [0, pi] (from +Y) and azimuth
    /// `phi` in [0, 2*pi]. Out-of-range angles clamp to the border.
    pub fn lookup_spherical(&self, theta: f32, phi: f32) -> Color {
        let y = (theta / PI * self.height as f32) as i64;
        let x = (phi / (2.0 * PI) * self.width as f32) as i64;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        self.pixels[y * self.width as usize + x]
    }

    /// Radiance arriving from world direction `dir` (unit length).
    pub fn radiance(&self, dir: Vec3) -> Color {
        let phi = dir.z.atan2(dir.x) + PI;
        let theta = dir.y.clamp(-1.0, 1.0).acos();
        self.lookup_spherical(theta, phi)
    }
}
