//! SE(3) rigid-body transform.
//!
//! Camera poses are stored as `T_wc` (camera-to-world): applying the pose to
//! a point expressed in the camera frame yields its world coordinates. The
//! inverse `T_cw` maps world points into the camera frame for projection.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    /// Create the identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Create a new SE3 from a rotation and a translation.
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build from a rotation matrix, re-orthonormalizing it first.
    ///
    /// Camera files store rotations as plain 3x3 matrices with limited
    /// precision, so the matrix is projected back onto SO(3).
    pub fn from_matrix(rotation: &Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let rot = Rotation3::from_matrix(rotation);
        Self {
            rotation: UnitQuaternion::from_rotation_matrix(&rot),
            translation,
        }
    }

    /// Create a pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation,
        }
    }

    /// Compute the inverse transform.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let translation = -(rotation * self.translation);
        Self {
            rotation,
            translation,
        }
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Composition `self * other` (apply `other` first).
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        *self.rotation.to_rotation_matrix().matrix()
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_round_trip() {
        let pose = SE3::new(
            UnitQuaternion::from_euler_angles(0.1, -0.4, 0.7),
            Vector3::new(1.0, -2.0, 0.5),
        );
        let p = Vector3::new(0.3, 4.0, -1.2);

        let back = pose.inverse().transform_point(&pose.transform_point(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_matches_sequential_application() {
        let a = SE3::new(
            UnitQuaternion::from_euler_angles(0.2, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let b = SE3::from_translation(Vector3::new(2.0, 0.0, 0.0));
        let p = Vector3::new(1.0, 1.0, 1.0);

        assert_relative_eq!(
            a.compose(&b).transform_point(&p),
            a.transform_point(&b.transform_point(&p)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_from_matrix_identity() {
        let pose = SE3::from_matrix(&Matrix3::identity(), Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(pose.rotation_matrix(), Matrix3::identity(), epsilon = 1e-12);
        assert_eq!(pose.translation, Vector3::new(1.0, 2.0, 3.0));
    }
}
