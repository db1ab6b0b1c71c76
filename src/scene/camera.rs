//! Pinhole camera: intrinsics plus a camera-to-world pose.

use nalgebra::{Matrix3, Vector2, Vector3};

use crate::geometry::SE3;

/// Points closer than this (in camera depth) do not project.
const MIN_DEPTH: f64 = 1e-9;

/// Pinhole intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
    /// Image size in pixels, when the source recorded it.
    pub image_size: Option<(u32, u32)>,
}

impl CameraIntrinsics {
    /// Create intrinsics with zero skew and no known image size.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
            image_size: None,
        }
    }

    pub fn from_k(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
            image_size: None,
        }
    }

    pub fn k(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx,
            0.0, self.fy, self.cy,
            0.0, 0.0, 1.0,
        )
    }

    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = Some((width, height));
        self
    }

    /// Image size for display: the recorded size, else twice the principal
    /// point. Never smaller than 1x1.
    pub fn display_size(&self) -> (u32, u32) {
        let (w, h) = self
            .image_size
            .unwrap_or(((2.0 * self.cx) as u32, (2.0 * self.cy) as u32));
        (w.max(1), h.max(1))
    }
}

/// A posed camera.
///
/// The pose is stored as `T_wc`; the world-to-camera inverse is cached
/// because every projection needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    intrinsics: CameraIntrinsics,
    pose_wc: SE3,
    pose_cw: SE3,
}

impl Camera {
    /// Create a new Camera from its intrinsics and world-from-camera pose.
    pub fn new(intrinsics: CameraIntrinsics, pose_wc: SE3) -> Self {
        let pose_cw = pose_wc.inverse();
        Self {
            intrinsics,
            pose_wc,
            pose_cw,
        }
    }

    /// Get the camera intrinsics.
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Camera-to-world pose.
    pub fn pose(&self) -> &SE3 {
        &self.pose_wc
    }

    /// World-to-camera pose.
    pub fn pose_cw(&self) -> &SE3 {
        &self.pose_cw
    }

    /// Camera center in world coordinates.
    pub fn center(&self) -> Vector3<f64> {
        self.pose_wc.translation
    }

    /// Replace the world-from-camera pose.
    pub fn set_pose(&mut self, pose_wc: SE3) {
        self.pose_cw = pose_wc.inverse();
        self.pose_wc = pose_wc;
    }

    /// Record the image size discovered from the frame's image file.
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.intrinsics.image_size = Some((width, height));
    }

    /// Project a world point into pixel coordinates.
    ///
    /// Returns `None` for points behind (or on) the image plane and for
    /// projections that are not finite.
    pub fn project(&self, point_world: &Vector3<f64>) -> Option<Vector2<f64>> {
        let p = self.pose_cw.transform_point(point_world);
        if p.z <= MIN_DEPTH {
            return None;
        }

        let x = p.x / p.z;
        let y = p.y / p.z;
        let k = &self.intrinsics;
        let u = k.fx * x + k.skew * y + k.cx;
        let v = k.fy * y + k.cy;

        (u.is_finite() && v.is_finite()).then(|| Vector2::new(u, v))
    }
}
