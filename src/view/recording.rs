//! In-memory sink used by tests and the command-line summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::scene::{Camera, FrameId, TrackId};

use super::ViewSink;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    AddCamera(FrameId),
    SetActiveFrame(Option<FrameId>),
    AddLandmark(TrackId, f64, f64),
    AddResidual(TrackId, f64, f64, f64, f64),
    ClearLandmarks,
    ClearResiduals,
    SetImage(Option<PathBuf>, (u32, u32)),
}

/// Keeps the full call log plus the currently displayed state.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    cameras: BTreeMap<FrameId, Camera>,
    active_frame: Option<FrameId>,
    landmarks: Vec<(TrackId, f64, f64)>,
    residuals: Vec<(TrackId, f64, f64, f64, f64)>,
    /// Number of times the camera view was cleared.
    refreshes: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn cameras(&self) -> &BTreeMap<FrameId, Camera> {
        &self.cameras
    }

    pub fn active_frame(&self) -> Option<FrameId> {
        self.active_frame
    }

    pub fn landmarks(&self) -> &[(TrackId, f64, f64)] {
        &self.landmarks
    }

    pub fn residuals(&self) -> &[(TrackId, f64, f64, f64, f64)] {
        &self.residuals
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl ViewSink for RecordingSink {
    fn add_camera(&mut self, id: FrameId, camera: &Camera) {
        self.cameras.insert(id, camera.clone());
        self.calls.push(SinkCall::AddCamera(id));
    }

    fn set_active_frame(&mut self, id: Option<FrameId>) {
        self.active_frame = id;
        self.calls.push(SinkCall::SetActiveFrame(id));
    }

    fn add_landmark(&mut self, id: TrackId, x: f64, y: f64) {
        self.landmarks.push((id, x, y));
        self.calls.push(SinkCall::AddLandmark(id, x, y));
    }

    fn add_residual(&mut self, id: TrackId, fx: f64, fy: f64, lx: f64, ly: f64) {
        self.residuals.push((id, fx, fy, lx, ly));
        self.calls.push(SinkCall::AddResidual(id, fx, fy, lx, ly));
    }

    fn clear_landmarks(&mut self) {
        self.landmarks.clear();
        self.refreshes += 1;
        self.calls.push(SinkCall::ClearLandmarks);
    }

    fn clear_residuals(&mut self) {
        self.residuals.clear();
        self.calls.push(SinkCall::ClearResiduals);
    }

    fn set_image(&mut self, path: Option<&Path>, size: (u32, u32)) {
        self.calls.push(SinkCall::SetImage(path.map(Path::to_path_buf), size));
    }
}
