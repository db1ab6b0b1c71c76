//! ViewerSession - the control-thread owner of all viewer state.
//!
//! The session owns the scene, the frame registry, the tool controller and
//! the result coalescer, and is the only place any of them is mutated. A
//! tool's worker thread reaches the session only through the controller's
//! event channel, drained by [`ViewerSession::pump`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{never, select};
use tracing::{debug, info, warn};

use crate::error::{DecodeError, SceneError, ToolError};
use crate::io::{self, ProjectManifest};
use crate::projection::{ActiveFrameProjector, ActiveFrameView};
use crate::registry::{FrameChange, FrameRegistry};
use crate::scene::{Camera, FrameId, LandmarkMap, SceneState, TrackSet};
use crate::tools::{
    DEFAULT_MERGE_DELAY, MergeReport, ResultCoalescer, RunId, Tool, ToolEvent,
    ToolExecutionController, ToolInputs, ToolState, ToolTransition,
};
use crate::view::{ViewSink, present};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Debounce window for merging streamed tool results.
    pub merge_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            merge_delay: DEFAULT_MERGE_DELAY,
        }
    }
}

/// Outcome of loading a project: what was added and what could not be.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub frames_added: usize,
    pub cameras_loaded: usize,
    /// Non-fatal problems, one per missing piece of data.
    pub problems: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<DecodeError>,
}

/// Frame registry, scene data and tool runner behind one viewer.
pub struct ViewerSession<S: ViewSink> {
    scene: SceneState,
    frames: FrameRegistry,
    projector: ActiveFrameProjector,
    controller: ToolExecutionController,
    coalescer: ResultCoalescer,
    sink: S,
    view: ActiveFrameView,
    refreshes: usize,
}

impl<S: ViewSink> ViewerSession<S> {
    /// Create a new ViewerSession drawing to the given sink.
    pub fn new(config: SessionConfig, sink: S) -> Self {
        Self {
            scene: SceneState::new(),
            frames: FrameRegistry::new(),
            projector: ActiveFrameProjector::new(),
            controller: ToolExecutionController::new(),
            coalescer: ResultCoalescer::new(config.merge_delay),
            sink,
            view: ActiveFrameView::none(),
            refreshes: 0,
        }
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn frames(&self) -> &FrameRegistry {
        &self.frames
    }

    /// True once the first frame exists; enables playback.
    pub fn has_frames(&self) -> bool {
        self.frames.has_frames()
    }

    /// Current camera-view contents.
    pub fn view(&self) -> &ActiveFrameView {
        &self.view
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn tool_state(&self) -> ToolState {
        self.controller.state()
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.controller.active_tool()
    }

    /// Number of times the active-frame view was recomputed.
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    /// Number of non-empty tool result merges.
    pub fn merge_count(&self) -> u64 {
        self.coalescer.merge_count()
    }

    // ---- frame inputs ----

    /// Add a camera, pairing it with the oldest orphan image if there is one.
    pub fn add_camera(&mut self, camera: Camera) -> FrameChange {
        let change = self.frames.add_camera_frame(&mut self.scene, camera);
        self.frame_changed(change);
        change
    }

    /// Add an image, pairing it with the oldest orphan camera if there is one.
    pub fn add_image(&mut self, path: PathBuf) -> FrameChange {
        let change = self.frames.add_image_frame(&mut self.scene, path.clone());
        self.load_image_size(change.id(), &path);
        self.frame_changed(change);
        change
    }

    /// Add a frame whose camera and image are known together.
    pub fn add_frame(&mut self, camera: Option<Camera>, image: Option<PathBuf>) -> FrameChange {
        let change = self.frames.add_frame(&mut self.scene, camera, image.clone());
        if let Some(path) = image {
            self.load_image_size(change.id(), &path);
        }
        self.frame_changed(change);
        change
    }

    /// Read a KRTD file and add its camera.
    pub fn load_camera_file(&mut self, path: &Path) -> Result<FrameChange> {
        let camera = io::read_krtd(path)
            .with_context(|| format!("Failed to load camera {}", path.display()))?;
        Ok(self.add_camera(camera))
    }

    /// Replace the scene's tracks with the contents of `path`.
    pub fn load_tracks(&mut self, path: &Path) -> Result<usize> {
        let tracks = io::read_tracks(path)
            .with_context(|| format!("Failed to load tracks {}", path.display()))?;
        let count = tracks.len();
        info!("Loaded {} tracks from {}", count, path.display());
        self.scene.replace_tracks(tracks.into());
        self.refresh();
        Ok(count)
    }

    /// Replace the scene's landmarks with the contents of `path`.
    pub fn load_landmarks(&mut self, path: &Path) -> Result<usize> {
        let landmarks = io::read_landmarks(path)
            .with_context(|| format!("Failed to load landmarks {}", path.display()))?;
        let count = landmarks.len();
        info!("Loaded {} landmarks from {}", count, path.display());
        self.scene.replace_landmarks(landmarks.into());
        self.refresh();
        Ok(count)
    }

    /// Load a JSON project. Only an unreadable manifest is an error; every
    /// other failure leaves the affected data absent and is reported.
    pub fn load_project(&mut self, path: &Path) -> Result<LoadReport> {
        let manifest = ProjectManifest::load(path)
            .with_context(|| format!("Failed to load project {}", path.display()))?;
        let mut report = LoadReport::default();

        for image in &manifest.images {
            let change = match manifest.camera_path_for(image) {
                None => self.add_image(image.clone()),
                Some(camera_path) => match io::read_krtd(&camera_path) {
                    Ok(camera) => {
                        report.cameras_loaded += 1;
                        self.add_frame(Some(camera), Some(image.clone()))
                    }
                    Err(e) => {
                        warn!("Frame partially unavailable: {}", e);
                        report.problems.push(e.to_string());
                        self.add_frame(None, Some(image.clone()))
                    }
                },
            };
            if matches!(change, FrameChange::Created { .. }) {
                report.frames_added += 1;
            }
        }

        for (&index, depth) in &manifest.depth_maps {
            if let Err(e) = self.set_depth_map(FrameId::new(index), depth.clone()) {
                warn!("Ignoring depth map {}: {}", depth.display(), e);
                report.problems.push(e.to_string());
            }
        }

        if let Some(tracks) = &manifest.tracks {
            if let Err(e) = self.load_tracks(tracks) {
                warn!("{:#}", e);
                report.problems.push(format!("{e:#}"));
            }
        }
        if let Some(landmarks) = &manifest.landmarks {
            if let Err(e) = self.load_landmarks(landmarks) {
                warn!("{:#}", e);
                report.problems.push(format!("{e:#}"));
            }
        }

        info!(
            "Loaded project {}: {} frames, {} cameras, {} problems",
            path.display(),
            report.frames_added,
            report.cameras_loaded,
            report.problems.len()
        );
        Ok(report)
    }

    pub fn set_depth_map(&mut self, id: FrameId, path: PathBuf) -> Result<(), SceneError> {
        self.frames.set_depth_map(id, path)?;
        if self.scene.active_frame() == Some(id) {
            self.refresh();
        }
        Ok(())
    }

    // ---- navigation ----

    /// Make `id` the active frame. Out-of-range ids are rejected and nothing
    /// changes.
    pub fn set_active_frame(&mut self, id: FrameId) -> Result<(), SceneError> {
        if let Err(e) = self.scene.set_active_frame(id, self.frames.len()) {
            warn!("Rejected active frame request: {}", e);
            return Err(e);
        }
        self.refresh();
        Ok(())
    }

    /// Advance to the next frame. At the last frame, wraps to the first if
    /// `looping`; otherwise returns `None` and stays put.
    pub fn next_frame(&mut self, looping: bool) -> Option<FrameId> {
        let count = self.frames.len();
        if count == 0 {
            return None;
        }
        let next = match self.scene.active_frame() {
            None => 0,
            Some(current) if current.index() + 1 < count => current.index() + 1,
            Some(_) if looping => 0,
            Some(_) => return None,
        };
        let id = FrameId::new(next);
        self.set_active_frame(id).ok()?;
        Some(id)
    }

    // ---- tools ----

    /// Start `tool` on a snapshot of the current scene.
    pub fn start_tool(&mut self, tool: Box<dyn Tool>) -> Result<RunId, ToolError> {
        let inputs = ToolInputs::snapshot(&self.scene, &self.frames);
        self.controller.start(tool, inputs, &mut self.coalescer)
    }

    /// Request cancellation of the running tool.
    pub fn cancel_tool(&mut self) -> Result<(), ToolError> {
        self.controller.cancel()
    }

    /// Wait up to `timeout` for one tool event or the merge deadline and
    /// handle it. Returns false if nothing happened.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        let events = self.controller.events().clone();
        let deadline = self.coalescer.deadline().cloned().unwrap_or_else(never);

        select! {
            recv(events) -> event => match event {
                Ok(event) => self.handle_tool_event(event),
                Err(_) => return false,
            },
            recv(deadline) -> _ => {
                debug!("Merge deadline reached");
                self.merge_pending();
            },
            default(timeout) => return false,
        }
        true
    }

    /// Pump until no tool is running, or until `timeout` elapses. Returns
    /// true if the session is idle.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let end = Instant::now() + timeout;
        while !self.controller.is_idle() {
            let now = Instant::now();
            if now >= end {
                return false;
            }
            self.pump(end - now);
        }
        true
    }

    fn handle_tool_event(&mut self, event: ToolEvent) {
        match self.controller.handle_event(event, &mut self.coalescer) {
            ToolTransition::Ignored | ToolTransition::Staged { .. } => {}
            ToolTransition::Finished { .. } => {
                self.merge_pending();
            }
        }
    }

    /// Apply staged tool results, refreshing the view once if anything was
    /// staged.
    pub fn merge_pending(&mut self) -> MergeReport {
        let report = self.coalescer.merge_into(&mut self.frames, &mut self.scene);
        if report.is_noop() {
            return report;
        }
        for &id in &report.cameras_updated {
            if let Some(camera) = self.scene.camera(id) {
                self.sink.add_camera(id, camera);
            }
        }
        self.refresh();
        report
    }

    // ---- export ----

    /// Write one KRTD file per posed frame into `dir`. Per-file failures are
    /// collected rather than aborting the export.
    pub fn export_cameras(&self, dir: &Path) -> Result<ExportReport, DecodeError> {
        fs::create_dir_all(dir).map_err(|e| DecodeError::io(dir, e))?;
        let mut report = ExportReport::default();
        for frame in self.frames.frames() {
            let Some(camera) = frame.camera.as_ref() else {
                continue;
            };
            let path = dir.join(export_file_name(frame.id, frame.image_path()));
            match io::write_krtd(&path, camera) {
                Ok(()) => report.written.push(path),
                Err(e) => {
                    warn!("Failed to export camera for {}: {}", frame.id, e);
                    report.failures.push(e);
                }
            }
        }
        info!("Exported {} cameras to {}", report.written.len(), dir.display());
        Ok(report)
    }

    /// Write the scene's current tracks to a CSV file. Returns the number of
    /// tracks written; an empty file is written when there are none.
    pub fn export_tracks(&self, path: &Path) -> Result<usize, DecodeError> {
        let empty = TrackSet::default();
        let tracks = self.scene.tracks().map_or(&empty, |t| &**t);
        if let Err(e) = io::write_tracks(path, tracks) {
            warn!("Failed to export tracks: {}", e);
            return Err(e);
        }
        info!("Exported {} tracks to {}", tracks.len(), path.display());
        Ok(tracks.len())
    }

    /// Write the scene's current landmarks to a CSV file. Returns the number
    /// of landmarks written.
    pub fn export_landmarks(&self, path: &Path) -> Result<usize, DecodeError> {
        let empty = LandmarkMap::new();
        let landmarks = self.scene.landmarks().map_or(&empty, |l| &**l);
        if let Err(e) = io::write_landmarks(path, landmarks) {
            warn!("Failed to export landmarks: {}", e);
            return Err(e);
        }
        info!("Exported {} landmarks to {}", landmarks.len(), path.display());
        Ok(landmarks.len())
    }

    // ---- internals ----

    fn load_image_size(&mut self, id: FrameId, path: &Path) {
        match io::read_image_size(path) {
            Ok(size) => self.frames.set_image_size(&mut self.scene, id, size),
            Err(e) => warn!("Frame partially unavailable: {}", e),
        }
    }

    fn frame_changed(&mut self, change: FrameChange) {
        let id = change.id();
        if let Some(camera) = self.scene.camera(id) {
            self.sink.add_camera(id, camera);
        }
        if change.is_first() {
            info!("First frame created; playback enabled");
            if self.set_active_frame(id).is_ok() {
                return;
            }
        }
        if self.scene.active_frame() == Some(id) {
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        self.view = self.projector.project(&self.scene, &self.frames);
        present(&self.view, &mut self.sink);
        self.refreshes += 1;
    }
}

fn export_file_name(id: FrameId, image: Option<&Path>) -> PathBuf {
    match image.and_then(Path::file_stem) {
        Some(stem) => {
            let mut name = stem.to_os_string();
            name.push(".krtd");
            PathBuf::from(name)
        }
        None => PathBuf::from(format!("frame_{:04}.krtd", id.index())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RecordingSink;

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(FrameId::new(3), Some(Path::new("/data/img_0042.jpg"))),
            PathBuf::from("img_0042.krtd")
        );
        assert_eq!(
            export_file_name(FrameId::new(12), None),
            PathBuf::from("frame_0012.krtd")
        );
    }

    #[test]
    fn test_merge_with_nothing_staged_does_not_refresh() {
        let mut session = ViewerSession::new(SessionConfig::default(), RecordingSink::new());
        session.add_image("a.png".into());
        let refreshes = session.refresh_count();

        assert!(session.merge_pending().is_noop());
        assert_eq!(session.refresh_count(), refreshes);
        assert_eq!(session.merge_count(), 0);
    }

    #[test]
    fn test_pairing_active_frame_refreshes_view() {
        let mut session = ViewerSession::new(SessionConfig::default(), RecordingSink::new());
        session.add_image("a.png".into());
        assert!(!session.view().has_camera);

        let camera = Camera::new(
            crate::scene::CameraIntrinsics::new(100.0, 100.0, 50.0, 50.0),
            crate::geometry::SE3::identity(),
        );
        let change = session.add_camera(camera);
        assert_eq!(change, FrameChange::Paired { id: FrameId::new(0) });
        assert!(session.view().has_camera);
        assert_eq!(session.sink().cameras().len(), 1);
    }
}
