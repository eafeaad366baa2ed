//! Dielectric interface helpers in the local shading frame (normal = +Z).

use verdant_math::Vec3;

/// Cosine of the transmitted angle by Snell's law, or `None` on total
/// internal reflection. `cos_theta_i` must be non-negative.
#[inline]
pub fn snell_cos_theta_t(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> Option<f32> {
    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = sin_theta_i * eta_i / eta_t;
    if sin_theta_t >= 1.0 {
        return None;
    }
    Some((1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt())
}

/// Exact Fresnel reflectance of a dielectric interface for unpolarized light.
///
/// The sign of `cos_theta_i` says which side the light arrives from: a
/// negative cosine means it travels inside the `eta_t` medium, and the
/// indices are swapped. Total internal reflection gives 1.
pub fn fr_dielectric(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    if eta_i == eta_t {
        return 0.0;
    }

    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let (mut eta_i, mut eta_t) = (eta_i, eta_t);
    if cos_theta_i < 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
        cos_theta_i = cos_theta_i.abs();
    }

    let Some(cos_theta_t) = snell_cos_theta_t(cos_theta_i, eta_i, eta_t) else {
        return 1.0;
    };

    // s and p polarized reflectances
    let r_parl = (eta_t * cos_theta_i - eta_i * cos_theta_t) / (eta_t * cos_theta_i + eta_i * cos_theta_t);
    let r_perp = (eta_i * cos_theta_i - eta_t * cos_theta_t) / (eta_i * cos_theta_i + eta_t * cos_theta_t);
    (r_parl * r_parl + r_perp * r_perp) / 2.0
}

/// Schlick's approximation of [`fr_dielectric`] for light arriving from the
/// `eta_i` side.
pub fn fr_schlick(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let r0 = ((eta_i - eta_t) / (eta_i + eta_t)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos_theta_i.abs()).powi(5)
}

/// Mirror `v` about the local normal.
#[inline]
pub fn reflect(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, -v.y, v.z)
}

/// Refract `v` (pointing away from the surface) through the interface.
///
/// `eta` is the ratio of the index on `v`'s side over the index on the far
/// side. Returns `None` on total internal reflection.
pub fn refract(v: Vec3, eta: f32) -> Option<Vec3> {
    let n = if v.z >= 0.0 { Vec3::Z } else { -Vec3::Z };
    let cos_theta_i = v.z.abs();
    let sin2_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0);
    let sin2_theta_t = eta * eta * sin2_theta_i;
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();
    Some((-v * eta + n * (eta * cos_theta_i - cos_theta_t)).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_incidence_glass() {
        // ((1 - 1.5) / (1 + 1.5))^2
        assert!((fr_dielectric(1.0, 1.0, 1.5) - 0.04).abs() < 1e-5);
        assert!((fr_schlick(1.0, 1.0, 1.5) - 0.04).abs() < 1e-5);
    }

    #[test]
    fn test_matching_indices_do_not_reflect() {
        assert_eq!(fr_dielectric(0.3, 1.5, 1.5), 0.0);
        assert_eq!(fr_dielectric(-0.8, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_total_internal_reflection() {
        // From inside glass at a grazing angle
        assert_eq!(fr_dielectric(-0.1, 1.0, 1.5), 1.0);
        assert!(snell_cos_theta_t(0.1, 1.5, 1.0).is_none());
        assert!(refract(Vec3::new(0.99, 0.0, -0.141).normalize(), 1.5).is_none());
    }

    #[test]
    fn test_reflectance_grows_toward_grazing() {
        let head_on = fr_dielectric(1.0, 1.0, 1.5);
        let oblique = fr_dielectric(0.5, 1.0, 1.5);
        let grazing = fr_dielectric(0.05, 1.0, 1.5);
        assert!(head_on < oblique && oblique < grazing);
        assert!(grazing <= 1.0);
    }

    #[test]
    fn test_reflect_is_mirror() {
        let v = Vec3::new(0.3, -0.4, 0.866);
        assert_eq!(reflect(v), Vec3::new(-0.3, 0.4, 0.866));
    }

    #[test]
    fn test_refract_bends_toward_normal() {
        let v = Vec3::new(0.6, 0.0, 0.8);
        let t = refract(v, 1.0 / 1.5).unwrap();

        assert!(t.z < 0.0);
        assert!((t.length() - 1.0).abs() < 1e-5);
        // sin(theta_t) = sin(theta_i) / 1.5
        assert!((t.x.abs() - 0.6 / 1.5).abs() < 1e-5);
        assert!(t.x < 0.0);
    }
}
