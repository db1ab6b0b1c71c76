//! The canonical scene snapshot shown by the viewer.
//!
//! One `SceneState` lives for the whole session and is mutated only on the
//! control thread: by the frame registry when cameras arrive, by file loads,
//! and by the coalescer's merge step. Tool workers only ever see cheap
//! `Arc` snapshots of the tracks and landmarks.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SceneError;

use super::camera::Camera;
use super::landmark::LandmarkMap;
use super::track::TrackSet;
use super::types::FrameId;

/// Sparse frame id → camera mapping.
pub type CameraMap = BTreeMap<FrameId, Camera>;

#[derive(Debug, Clone, Default)]
pub struct SceneState {
    /// Absent entries mean "no pose yet". Written by the frame registry only.
    cameras: CameraMap,
    tracks: Option<Arc<TrackSet>>,
    landmarks: Option<Arc<LandmarkMap>>,
    active_frame: Option<FrameId>,
}

impl SceneState {
    /// Create a new empty SceneState.
    pub fn new() -> Self {
        Self::default()
    }

    /// All cameras, keyed by the frame they belong to.
    pub fn cameras(&self) -> &CameraMap {
        &self.cameras
    }

    /// Get the camera of the given frame, if it has one.
    pub fn camera(&self, id: FrameId) -> Option<&Camera> {
        self.cameras.get(&id)
    }

    pub(crate) fn camera_mut(&mut self, id: FrameId) -> Option<&mut Camera> {
        self.cameras.get_mut(&id)
    }

    pub(crate) fn insert_camera(&mut self, id: FrameId, camera: Camera) {
        self.cameras.insert(id, camera);
    }

    /// The current track set, if one has been loaded or produced.
    pub fn tracks(&self) -> Option<&Arc<TrackSet>> {
        self.tracks.as_ref()
    }

    /// The current landmark map, if one has been loaded or produced.
    pub fn landmarks(&self) -> Option<&Arc<LandmarkMap>> {
        self.landmarks.as_ref()
    }

    pub fn replace_tracks(&mut self, tracks: Arc<TrackSet>) {
        self.tracks = Some(tracks);
    }

    pub fn replace_landmarks(&mut self, landmarks: Arc<LandmarkMap>) {
        self.landmarks = Some(landmarks);
    }

    pub fn active_frame(&self) -> Option<FrameId> {
        self.active_frame
    }

    /// Make `id` the active frame.
    ///
    /// `frame_count` is the size of the frame collection; ids outside
    /// `[0, frame_count)` are rejected and the current active frame is kept.
    pub fn set_active_frame(&mut self, id: FrameId, frame_count: usize) -> Result<(), SceneError> {
        if id.index() >= frame_count {
            return Err(SceneError::InvalidFrame {
                id,
                count: frame_count,
            });
        }
        self.active_frame = Some(id);
        Ok(())
    }
}
