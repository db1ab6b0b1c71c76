//! The tool capability interface and the data that crosses the worker
//! boundary.
//!
//! A tool receives an immutable [`ToolInputs`] snapshot when it starts and
//! reports results through a [`ToolContext`]. It never sees the live scene.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::registry::FrameRegistry;
use crate::scene::{CameraMap, FrameId, LandmarkMap, SceneState, TrackSet};

use super::messages::{RunId, ToolEvent};

bitflags! {
    /// Kinds of scene data a tool may produce.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutputKinds: u8 {
        const CAMERAS = 1 << 0;
        const LANDMARKS = 1 << 1;
        const TRACKS = 1 << 2;
        const ACTIVE_FRAME = 1 << 3;
    }
}

/// Snapshot of the scene handed to a tool at start.
#[derive(Debug, Clone, Default)]
pub struct ToolInputs {
    pub active_frame: Option<FrameId>,
    /// Image path per frame, indexed by frame id.
    pub image_paths: Vec<Option<PathBuf>>,
    pub tracks: Option<Arc<TrackSet>>,
    pub cameras: Arc<CameraMap>,
    pub landmarks: Option<Arc<LandmarkMap>>,
}

impl ToolInputs {
    pub fn snapshot(scene: &SceneState, frames: &FrameRegistry) -> Self {
        Self {
            active_frame: scene.active_frame(),
            image_paths: frames.image_paths(),
            tracks: scene.tracks().cloned(),
            cameras: Arc::new(frames.camera_map()),
            landmarks: scene.landmarks().cloned(),
        }
    }

    pub fn has_tracks(&self) -> bool {
        self.tracks.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_landmarks(&self) -> bool {
        self.landmarks.as_ref().is_some_and(|l| !l.is_empty())
    }
}

/// Results reported by a tool. Only the kinds the tool declared in
/// [`Tool::outputs`] are picked up by the coalescer.
#[derive(Debug, Clone, Default)]
pub struct ToolData {
    pub cameras: Option<Arc<CameraMap>>,
    pub landmarks: Option<Arc<LandmarkMap>>,
    pub tracks: Option<Arc<TrackSet>>,
    pub active_frame: Option<FrameId>,
}

impl ToolData {
    pub fn with_cameras(mut self, cameras: CameraMap) -> Self {
        self.cameras = Some(Arc::new(cameras));
        self
    }

    pub fn with_landmarks(mut self, landmarks: LandmarkMap) -> Self {
        self.landmarks = Some(Arc::new(landmarks));
        self
    }

    pub fn with_tracks(mut self, tracks: TrackSet) -> Self {
        self.tracks = Some(Arc::new(tracks));
        self
    }

    pub fn with_active_frame(mut self, frame: FrameId) -> Self {
        self.active_frame = Some(frame);
        self
    }
}

/// Handle a running tool uses to report progress and observe cancellation.
pub struct ToolContext {
    run: RunId,
    sender: Sender<ToolEvent>,
    cancel: Arc<AtomicBool>,
    latest: Arc<Mutex<ToolData>>,
}

impl ToolContext {
    pub(crate) fn new(
        run: RunId,
        sender: Sender<ToolEvent>,
        cancel: Arc<AtomicBool>,
        latest: Arc<Mutex<ToolData>>,
    ) -> Self {
        Self {
            run,
            sender,
            cancel,
            latest,
        }
    }

    /// True once cancellation was requested for this run.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Publish a partial result. It also becomes the tool's current data.
    pub fn update(&self, data: ToolData) {
        *self.latest.lock() = data.clone();
        // The controller may already be gone during shutdown
        let _ = self.sender.send(ToolEvent::Updated {
            run: self.run,
            data,
        });
    }

    /// Replace the tool's current data without streaming it.
    pub fn set_data(&self, data: ToolData) {
        *self.latest.lock() = data;
    }

    /// The tool's current data; this is the final snapshot on completion.
    pub fn data(&self) -> ToolData {
        self.latest.lock().clone()
    }

    pub(crate) fn send(&self, event: ToolEvent) {
        let _ = self.sender.send(event);
    }

    pub(crate) fn run_id(&self) -> RunId {
        self.run
    }
}

/// A pluggable background computation.
///
/// `accepts` runs on the control thread before anything is spawned and is
/// the tool's chance to decline (e.g. missing inputs). `run` executes on the
/// worker thread; cancelable tools should poll [`ToolContext::is_cancelled`]
/// and return early.
pub trait Tool: Send + 'static {
    fn name(&self) -> &str;

    fn outputs(&self) -> OutputKinds;

    fn is_cancelable(&self) -> bool {
        false
    }

    fn accepts(&self, inputs: &ToolInputs) -> bool;

    fn run(&mut self, inputs: ToolInputs, ctx: &ToolContext) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) fn detached_context() -> (ToolContext, crossbeam_channel::Receiver<ToolEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let ctx = ToolContext::new(
        RunId(0),
        tx,
        Arc::new(AtomicBool::new(false)),
        Arc::new(Mutex::new(ToolData::default())),
    );
    (ctx, rx)
}

#[cfg(test)]
impl ToolContext {
    pub(crate) fn cancel_for_test(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}
