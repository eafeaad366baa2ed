//! Radiance accumulation buffer and image output.

use crate::error::RenderResult;
use crate::surface::Color;
use crate::tile::Tile;
use rayon::prelude::*;
use std::path::Path;
use verdant_math::Vec2;

/// Tone map linear radiance to 8-bit: divide by `exposure`, raise to
/// `gamma`, clamp to [0, 1], scale to 255.
#[inline]
pub fn tone_map(radiance: Color, exposure: f32, gamma: f32) -> [u8; 3] {
    let map = |c: f32| {
        let f = (c.max(0.0) / exposure).powf(gamma);
        (f.clamp(0.0, 1.0) * 255.0) as u8
    };
    [map(radiance.x), map(radiance.y), map(radiance.z)]
}

/// Row-major grid of linear RGB radiance with a per-pixel sample count.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
    counts: Vec<u32>,
}

impl Film {
    /// Create a new film filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![[0.0; 3]; len],
            counts: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Fold `li` into the running mean of the samples seen at (x, y).
    pub fn average_radiance(&mut self, x: u32, y: u32, li: Color) {
        let i = self.index(x, y);
        let n = self.counts[i] + 1;
        let prev = Color::from(self.pixels[i]);
        self.pixels[i] = (prev + (li - prev) / n as f32).to_array();
        self.counts[i] = n;
    }

    /// Add `li` to the stored value, leaving the sample count alone.
    pub fn accumulate_radiance(&mut self, x: u32, y: u32, li: Color) {
        let i = self.index(x, y);
        self.pixels[i] = (Color::from(self.pixels[i]) + li).to_array();
    }

    pub fn radiance(&self, x: u32, y: u32) -> Color {
        Color::from(self.pixels[self.index(x, y)])
    }

    /// Number of samples averaged into (x, y).
    pub fn sample_count(&self, x: u32, y: u32) -> u32 {
        self.counts[self.index(x, y)]
    }

    /// Reset every pixel to black with no samples.
    pub fn clear(&mut self) {
        self.pixels.fill([0.0; 3]);
        self.counts.fill(0);
    }

    /// Film coordinates of the top-left corner of pixel (x, y).
    pub fn xy_to_uv(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(x as f32 / self.width as f32, y as f32 / self.height as f32)
    }

    /// Flat view of the buffer: RGB triples, row pitch `3 * width`.
    pub fn as_rgb_f32(&self) -> &[f32] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Copy a tile-sized film into the `tile` region of this one.
    pub fn write_tile(&mut self, tile: &Tile, src: &Film) {
        debug_assert_eq!((src.width, src.height), (tile.width, tile.height));
        debug_assert!(tile.x + tile.width <= self.width && tile.y + tile.height <= self.height);

        let row = tile.width as usize;
        for local_y in 0..tile.height {
            let dst = self.index(tile.x, tile.y + local_y);
            let from = src.index(0, local_y);
            self.pixels[dst..dst + row].copy_from_slice(&src.pixels[from..from + row]);
            self.counts[dst..dst + row].copy_from_slice(&src.counts[from..from + row]);
        }
    }

    /// Tone map the whole buffer to packed 8-bit RGB.
    pub fn to_rgb8(&self, exposure: f32, gamma: f32) -> Vec<u8> {
        self.pixels
            .par_iter()
            .flat_map_iter(|p| tone_map(Color::from(*p), exposure, gamma))
            .collect()
    }

    /// Write the tone-mapped image; the format follows the file extension
    /// (`.ppm`, `.png`, ...).
    pub fn save(&self, path: impl AsRef<Path>, exposure: f32, gamma: f32) -> RenderResult<()> {
        let path = path.as_ref();
        let bytes = self.to_rgb8(exposure, gamma);
        image::save_buffer(path, &bytes, self.width, self.height, image::ColorType::Rgb8)?;
        log::info!("Wrote {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }
}
