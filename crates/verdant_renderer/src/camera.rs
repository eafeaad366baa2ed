//! Pinhole camera for ray generation.

use verdant_math::{Ray, Vec2, Vec3};

/// A pinhole camera looking from `look_from` toward `look_at`.
///
/// Image coordinates follow the film: `uv` runs from (0, 0) at the top-left
/// to (1, 1) at the bottom-right; normalized device coordinates run from
/// -1 to 1 with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,
    aspect_ratio: f32,

    // Cached basis, refreshed by every builder method
    u: Vec3,
    v: Vec3,
    w: Vec3,
    half_height: f32,
    half_width: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
    }
}

impl Camera {
    /// Create a camera with a 90 degree vertical field of view and 4:3 aspect.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn look_at(look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        let mut camera = Self {
            look_from,
            look_at,
            vup,
            vfov: 90.0,
            aspect_ratio: 4.0 / 3.0,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            half_height: 1.0,
            half_width: 1.0,
        };
        camera.update();
        camera
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.update();
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov_y(mut self, degrees: f32) -> Self {
        self.vfov = degrees;
        self.update();
        self
    }

    /// Set width / height of the image plane.
    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self.update();
        self
    }

    fn update(&mut self) {
        self.half_height = (self.vfov.to_radians() / 2.0).tan();
        self.half_width = self.half_height * self.aspect_ratio;

        // Calculate camera basis vectors
        self.w = (self.look_from - self.look_at).normalize_or_zero();
        if self.w == Vec3::ZERO {
            self.w = Vec3::Z;
        }
        self.u = self.vup.cross(self.w).normalize_or_zero();
        if self.u == Vec3::ZERO {
            // vup parallel to the view direction
            self.u = self.w.any_orthonormal_vector();
        }
        self.v = self.w.cross(self.u);
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }

    pub fn fov_y(&self) -> f32 {
        self.vfov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Map film coordinates to NDC, flipping Y so that up is positive.
    pub fn uv_to_ndc(uv: Vec2) -> Vec2 {
        let ndc = uv * 2.0 - Vec2::ONE;
        Vec2::new(ndc.x, -ndc.y)
    }

    pub fn generate_ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let dir = -self.w + self.u * (ndc.x * self.half_width) + self.v * (ndc.y * self.half_height);
        Ray::new(self.look_from, dir)
    }

    pub fn generate_ray_from_uv(&self, uv: Vec2) -> Ray {
        self.generate_ray_from_ndc(Self::uv_to_ndc(uv))
    }
}
