//! Rerun-backed sink.
//!
//! Entity hierarchy:
//!     world/cameras/F{n}       - Camera transform and pinhole per frame
//!     camera/image             - Active frame image
//!     camera/image/landmarks   - Projected landmarks (blue dots)
//!     camera/image/features    - Observed features (green dots)
//!     camera/image/residuals   - Feature-to-landmark segments (red)
//!     status                   - Active frame text

use std::path::Path;

use anyhow::Context;
use rerun::{RecordingStream, external::glam};
use tracing::warn;

use crate::geometry::SE3;
use crate::scene::{Camera, FrameId, TrackId};

use super::ViewSink;

/// View sink that logs to a Rerun viewer.
pub struct RerunSink {
    rec: RecordingStream,
    landmarks: Vec<[f32; 2]>,
    features: Vec<[f32; 2]>,
    segments: Vec<[[f32; 2]; 2]>,
}

impl RerunSink {
    /// Spawn a Rerun viewer process and stream to it.
    pub fn spawn(app_name: &str) -> anyhow::Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("Failed to spawn rerun viewer")?;
        rec.log_static("world", &rerun::ViewCoordinates::RDF()).ok();
        Ok(Self {
            rec,
            landmarks: Vec::new(),
            features: Vec::new(),
            segments: Vec::new(),
        })
    }
}

fn to_glam(pose: &SE3) -> (glam::Vec3, glam::Quat) {
    let translation = glam::Vec3::new(
        pose.translation.x as f32,
        pose.translation.y as f32,
        pose.translation.z as f32,
    );
    let rotation = glam::Quat::from_xyzw(
        pose.rotation.coords.x as f32,
        pose.rotation.coords.y as f32,
        pose.rotation.coords.z as f32,
        pose.rotation.w as f32,
    );
    (translation, rotation)
}

impl ViewSink for RerunSink {
    fn add_camera(&mut self, id: FrameId, camera: &Camera) {
        let path = format!("world/cameras/{id}");
        let (translation, rotation) = to_glam(camera.pose());
        self.rec
            .log(
                path.as_str(),
                &rerun::Transform3D::from_translation_rotation(translation, rotation),
            )
            .ok();

        let k = camera.intrinsics();
        let (w, h) = k.display_size();
        self.rec
            .log(
                path.as_str(),
                &rerun::Pinhole::from_focal_length_and_resolution(
                    [k.fx as f32, k.fy as f32],
                    [w as f32, h as f32],
                ),
            )
            .ok();
    }

    fn set_active_frame(&mut self, id: Option<FrameId>) {
        let text = match id {
            Some(id) => format!("Active frame: {id}"),
            None => "No active frame".to_string(),
        };
        self.rec.log("status", &rerun::TextDocument::new(text)).ok();
    }

    fn add_landmark(&mut self, _id: TrackId, x: f64, y: f64) {
        self.landmarks.push([x as f32, y as f32]);
    }

    fn add_residual(&mut self, _id: TrackId, fx: f64, fy: f64, lx: f64, ly: f64) {
        let feature = [fx as f32, fy as f32];
        self.features.push(feature);
        self.segments.push([feature, [lx as f32, ly as f32]]);
    }

    fn clear_landmarks(&mut self) {
        self.landmarks.clear();
        self.rec
            .log("camera/image/landmarks", &rerun::Clear::flat())
            .ok();
    }

    fn clear_residuals(&mut self) {
        self.features.clear();
        self.segments.clear();
        self.rec
            .log("camera/image/features", &rerun::Clear::flat())
            .ok();
        self.rec
            .log("camera/image/residuals", &rerun::Clear::flat())
            .ok();
    }

    fn set_image(&mut self, path: Option<&Path>, _size: (u32, u32)) {
        let Some(path) = path else {
            self.rec.log("camera/image", &rerun::Clear::flat()).ok();
            return;
        };
        match rerun::EncodedImage::from_file(path) {
            Ok(image) => {
                self.rec.log("camera/image", &image).ok();
            }
            Err(e) => warn!("Failed to load image {:?} for display: {}", path, e),
        }
    }

    fn flush(&mut self) {
        if !self.landmarks.is_empty() {
            self.rec
                .log(
                    "camera/image/landmarks",
                    &rerun::Points2D::new(self.landmarks.iter().copied())
                        .with_colors([[0u8, 128, 255]])
                        .with_radii([3.0f32]),
                )
                .ok();
        }
        if !self.segments.is_empty() {
            self.rec
                .log(
                    "camera/image/features",
                    &rerun::Points2D::new(self.features.iter().copied())
                        .with_colors([[0u8, 255, 0]])
                        .with_radii([2.0f32]),
                )
                .ok();
            self.rec
                .log(
                    "camera/image/residuals",
                    &rerun::LineStrips2D::new(self.segments.iter().map(|s| s.to_vec()))
                        .with_colors([[255u8, 0, 0]]),
                )
                .ok();
        }
    }
}
