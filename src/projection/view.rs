//! Derived per-frame view: what the camera view shows for the active frame.

use std::path::PathBuf;

use nalgebra::Vector2;

use crate::scene::{FrameId, TrackId};

/// Placeholder image size used when nothing better is known.
pub const PLACEHOLDER_IMAGE_SIZE: (u32, u32) = (1, 1);

/// A landmark projected into the active frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedLandmark {
    pub id: TrackId,
    pub loc: Vector2<f64>,
}

/// Observed feature vs. projected landmark for one track in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub id: TrackId,
    pub feature: Vector2<f64>,
    pub landmark: Vector2<f64>,
}

impl Residual {
    /// Reprojection error in pixels.
    pub fn error(&self) -> f64 {
        (self.feature - self.landmark).norm()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveFrameView {
    pub frame: Option<FrameId>,
    pub image_path: Option<PathBuf>,
    pub depth_map_path: Option<PathBuf>,
    pub image_size: (u32, u32),
    pub has_camera: bool,
    pub landmarks: Vec<ProjectedLandmark>,
    pub residuals: Vec<Residual>,
}

impl ActiveFrameView {
    /// View with no active frame at all.
    pub fn none() -> Self {
        Self {
            frame: None,
            image_path: None,
            depth_map_path: None,
            image_size: PLACEHOLDER_IMAGE_SIZE,
            has_camera: false,
            landmarks: Vec::new(),
            residuals: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty() && self.residuals.is_empty()
    }

    pub fn rms_residual(&self) -> Option<f64> {
        if self.residuals.is_empty() {
            return None;
        }
        let sum_sq: f64 = self.residuals.iter().map(|r| r.error().powi(2)).sum();
        Some((sum_sq / self.residuals.len() as f64).sqrt())
    }
}

impl Default for ActiveFrameView {
    fn default() -> Self {
        Self::none()
    }
}
