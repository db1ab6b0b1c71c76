//! Per-frame entity assembled from independently arriving inputs.

use std::path::{Path, PathBuf};

use crate::scene::{Camera, FrameId};

/// One reconstruction frame.
///
/// A frame is created by whichever of its camera or image arrives first;
/// the other half may be filled in later, or never.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub camera: Option<Camera>,
    pub image_path: Option<PathBuf>,
    pub depth_map_path: Option<PathBuf>,
    /// Image size read from the image file header, if it could be read.
    pub image_size: Option<(u32, u32)>,
}

impl Frame {
    pub(crate) fn new(id: FrameId, camera: Option<Camera>, image_path: Option<PathBuf>) -> Self {
        Self {
            id,
            camera,
            image_path,
            depth_map_path: None,
            image_size: None,
        }
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn depth_map_path(&self) -> Option<&Path> {
        self.depth_map_path.as_deref()
    }

    /// Best known image size: read from the file header, else the camera's own.
    pub fn known_image_size(&self) -> Option<(u32, u32)> {
        self.image_size
            .or_else(|| self.camera.as_ref().and_then(|c| c.intrinsics().image_size))
    }
}
