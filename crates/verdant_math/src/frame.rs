use crate::Vec3;

/// Orthonormal shading frame with the surface normal as local +Z.
///
/// BRDFs are evaluated in this frame, so `to_local(n).z == 1`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal.
    ///
    /// The helper axis is +Y unless the normal is within ~25 degrees of
    /// (anti)parallel to it, in which case +X is used instead.
    pub fn from_normal(normal: Vec3) -> Self {
        let helper = if normal.dot(Vec3::Y).abs() >= 0.9 {
            Vec3::X
        } else {
            Vec3::Y
        };
        let tangent = helper.cross(normal).normalize();
        let bitangent = normal.cross(tangent);
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Local (tangent space) direction to world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }

    /// World direction to local (tangent space).
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(frame: &Frame) {
        assert!((frame.tangent.length() - 1.0).abs() < 1e-5);
        assert!((frame.bitangent.length() - 1.0).abs() < 1e-5);
        assert!(frame.tangent.dot(frame.bitangent).abs() < 1e-5);
        assert!(frame.tangent.dot(frame.normal).abs() < 1e-5);
        assert!(frame.bitangent.dot(frame.normal).abs() < 1e-5);
        // Right handed: t x b = n
        assert!((frame.tangent.cross(frame.bitangent) - frame.normal).length() < 1e-5);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        for n in [
            Vec3::Z,
            Vec3::X,
            Vec3::Y,
            -Vec3::Y,
            Vec3::new(0.1, 0.99, 0.0).normalize(),
            Vec3::new(1.0, 2.0, -3.0).normalize(),
        ] {
            assert_orthonormal(&Frame::from_normal(n));
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = Frame::from_normal(Vec3::new(-0.3, 0.4, 0.5).normalize());
        let v = Vec3::new(0.2, -0.7, 0.4);

        assert!((frame.to_world(frame.to_local(v)) - v).length() < 1e-5);
        assert!((frame.to_local(frame.normal) - Vec3::Z).length() < 1e-5);
    }
}
