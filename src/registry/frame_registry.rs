//! FrameRegistry - pairing of camera and image arrivals into dense frames.
//!
//! Cameras and images are loaded independently (single files dropped on the
//! viewer, directory scans, project files) and may arrive in any order. The
//! registry assigns a frame id at the first arrival of either half and keeps
//! two FIFO "orphan" queues of frames still waiting for their other half:
//!
//! ```text
//! add_image("a")  -> F0 {image a}          orphan images:  [F0]
//! add_image("b")  -> F1 {image b}          orphan images:  [F0, F1]
//! add_camera(P1)  -> F0 {image a, P1}      orphan images:  [F1]
//! add_camera(P2)  -> F1 {image b, P2}      orphan images:  []
//! add_camera(P3)  -> F2 {P3}               orphan cameras: [F2]
//! ```
//!
//! Pairing never matches by content; the k-th orphan of one kind pairs with
//! the k-th arrival of the other kind after it.

use std::collections::VecDeque;
use std::path::PathBuf;

use tracing::debug;

use crate::error::SceneError;
use crate::scene::{Camera, CameraMap, FrameId, SceneState};

use super::frame::Frame;

/// What a registry call did to the frame collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameChange {
    /// A new frame was appended. `first` is true for the very first frame
    /// the registry ever created.
    Created { id: FrameId, first: bool },
    /// An existing orphan frame received its missing half.
    Paired { id: FrameId },
}

impl FrameChange {
    pub fn id(&self) -> FrameId {
        match *self {
            FrameChange::Created { id, .. } | FrameChange::Paired { id } => id,
        }
    }

    pub fn is_first(&self) -> bool {
        matches!(self, FrameChange::Created { first: true, .. })
    }
}

/// Owner of the ordered frame collection.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    frames: Vec<Frame>,
    /// Frames holding an image and waiting for a camera.
    orphan_images: VecDeque<FrameId>,
    /// Frames holding a camera and waiting for an image.
    orphan_cameras: VecDeque<FrameId>,
}

impl FrameRegistry {
    /// Create a new empty FrameRegistry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames created so far.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True once at least one frame exists; enables playback controls.
    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Get the frame with the given id, if it exists.
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.index())
    }

    /// All frames, indexed by their id.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frames holding an image still waiting for a camera, oldest first.
    pub fn orphan_images(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.orphan_images.iter().copied()
    }

    /// Frames holding a camera still waiting for an image, oldest first.
    pub fn orphan_cameras(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.orphan_cameras.iter().copied()
    }

    /// Register a camera whose image is not (yet) known.
    pub fn add_camera_frame(&mut self, scene: &mut SceneState, camera: Camera) -> FrameChange {
        match self.orphan_images.pop_front() {
            Some(id) => {
                self.attach_camera(scene, id, camera);
                debug!("Paired camera with orphan image {}", id);
                FrameChange::Paired { id }
            }
            None => {
                let change = self.add_frame(scene, Some(camera), None);
                self.orphan_cameras.push_back(change.id());
                change
            }
        }
    }

    /// Register an image whose camera is not (yet) known.
    pub fn add_image_frame(&mut self, scene: &mut SceneState, image_path: PathBuf) -> FrameChange {
        match self.orphan_cameras.pop_front() {
            Some(id) => {
                self.frames[id.index()].image_path = Some(image_path);
                debug!("Paired image with orphan camera {}", id);
                FrameChange::Paired { id }
            }
            None => {
                let change = self.add_frame(scene, None, Some(image_path));
                self.orphan_images.push_back(change.id());
                change
            }
        }
    }

    /// Append a frame whose inputs are known together, bypassing pairing.
    ///
    /// Supplying a camera declares the streams synchronized and drops any
    /// queued orphan images; supplying none drops queued orphan cameras.
    pub fn add_frame(
        &mut self,
        scene: &mut SceneState,
        camera: Option<Camera>,
        image_path: Option<PathBuf>,
    ) -> FrameChange {
        let id = FrameId::new(self.frames.len());

        if camera.is_some() {
            if !self.orphan_images.is_empty() {
                debug!("Dropping {} unmatched orphan images", self.orphan_images.len());
            }
            self.orphan_images.clear();
        } else {
            if !self.orphan_cameras.is_empty() {
                debug!("Dropping {} unmatched orphan cameras", self.orphan_cameras.len());
            }
            self.orphan_cameras.clear();
        }

        self.frames.push(Frame::new(id, None, image_path));
        if let Some(camera) = camera {
            self.attach_camera(scene, id, camera);
        }

        FrameChange::Created {
            id,
            first: self.frames.len() == 1,
        }
    }

    /// Apply a sparse id → camera mapping onto existing frames.
    ///
    /// Ids outside `[0, len)` are skipped. Returns the ids that changed, in
    /// ascending order.
    pub fn update_cameras(&mut self, scene: &mut SceneState, cameras: &CameraMap) -> Vec<FrameId> {
        let mut updated = Vec::with_capacity(cameras.len());
        for (&id, camera) in cameras {
            if id.index() >= self.frames.len() {
                debug!("Ignoring camera update for unknown frame {}", id);
                continue;
            }
            self.attach_camera(scene, id, camera.clone());
            updated.push(id);
        }
        updated
    }

    /// Associate a depth map with an existing frame.
    pub fn set_depth_map(&mut self, id: FrameId, path: PathBuf) -> Result<(), SceneError> {
        let count = self.frames.len();
        let frame = self
            .frames
            .get_mut(id.index())
            .ok_or(SceneError::InvalidFrame { id, count })?;
        frame.depth_map_path = Some(path);
        Ok(())
    }

    /// Record the image size read from the header of a frame and share it with its camera.
    pub fn set_image_size(&mut self, scene: &mut SceneState, id: FrameId, size: (u32, u32)) {
        let Some(frame) = self.frames.get_mut(id.index()) else {
            return;
        };
        frame.image_size = Some(size);
        if let Some(camera) = frame.camera.as_mut() {
            camera.set_image_size(size.0, size.1);
        }
        if let Some(camera) = scene.camera_mut(id) {
            camera.set_image_size(size.0, size.1);
        }
    }

    /// Image path of every frame, indexed by frame id.
    pub fn image_paths(&self) -> Vec<Option<PathBuf>> {
        self.frames.iter().map(|f| f.image_path.clone()).collect()
    }

    /// Cameras of all posed frames.
    pub fn camera_map(&self) -> CameraMap {
        self.frames
            .iter()
            .filter_map(|f| f.camera.clone().map(|c| (f.id, c)))
            .collect()
    }

    fn attach_camera(&mut self, scene: &mut SceneState, id: FrameId, mut camera: Camera) {
        let frame = &mut self.frames[id.index()];
        if camera.intrinsics().image_size.is_none() {
            if let Some((w, h)) = frame.known_image_size() {
                camera.set_image_size(w, h);
            }
        }
        scene.insert_camera(id, camera.clone());
        frame.camera = Some(camera);
    }
}
