//! ResultCoalescer - debounced merging of streamed tool results.
//!
//! A tool may publish many partial results in quick succession; refreshing
//! the derived view for each of them is wasted work. Partial results are
//! staged per field (latest wins) and a single one-shot deadline is armed
//! when the staging record first becomes non-empty. Further updates before
//! the deadline fires only overwrite staged fields, they never re-arm or
//! extend it. When the deadline fires, or the tool finishes, everything
//! staged is applied to the scene in one merge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use crate::registry::FrameRegistry;
use crate::scene::{CameraMap, FrameId, LandmarkMap, SceneState, TrackSet};

use super::tool::{OutputKinds, ToolData};

/// Default debounce window between the first staged result and the merge.
pub const DEFAULT_MERGE_DELAY: Duration = Duration::from_secs(1);

/// Staging record for tool results not yet merged into the scene.
#[derive(Debug, Clone, Default)]
pub struct PendingToolOutput {
    pub cameras: Option<Arc<CameraMap>>,
    pub landmarks: Option<Arc<LandmarkMap>>,
    pub tracks: Option<Arc<TrackSet>>,
    pub active_frame: Option<FrameId>,
}

impl PendingToolOutput {
    pub fn is_empty(&self) -> bool {
        self.cameras.is_none()
            && self.landmarks.is_none()
            && self.tracks.is_none()
            && self.active_frame.is_none()
    }
}

/// What a merge applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub cameras_updated: Vec<FrameId>,
    pub landmarks_replaced: bool,
    pub tracks_replaced: bool,
    pub active_frame: Option<FrameId>,
    /// A staged active frame that was out of range and therefore dropped.
    pub rejected_active_frame: Option<FrameId>,
    noop: bool,
}

impl MergeReport {
    fn noop() -> Self {
        Self {
            noop: true,
            ..Self::default()
        }
    }

    /// True when nothing was staged.
    pub fn is_noop(&self) -> bool {
        self.noop
    }
}

#[derive(Debug)]
pub struct ResultCoalescer {
    delay: Duration,
    /// Output kinds declared by the running tool.
    outputs: OutputKinds,
    pending: PendingToolOutput,
    deadline: Option<Receiver<Instant>>,
    merges: u64,
}

impl ResultCoalescer {
    /// Create a new coalescer that merges staged output after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            outputs: OutputKinds::empty(),
            pending: PendingToolOutput::default(),
            deadline: None,
            merges: 0,
        }
    }

    /// Start staging for a new tool run declaring `outputs`.
    pub fn begin(&mut self, outputs: OutputKinds) {
        self.outputs = outputs;
        self.pending = PendingToolOutput::default();
        self.deadline = None;
    }

    pub fn pending(&self) -> &PendingToolOutput {
        &self.pending
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// One-shot receiver that yields when the merge is due.
    pub fn deadline(&self) -> Option<&Receiver<Instant>> {
        self.deadline.as_ref()
    }

    /// Number of non-empty merges applied so far.
    pub fn merge_count(&self) -> u64 {
        self.merges
    }

    /// Stage a (partial) tool result. Returns true if this call armed the
    /// merge deadline.
    pub fn stage(&mut self, data: ToolData) -> bool {
        let outputs = self.outputs;
        if outputs.contains(OutputKinds::CAMERAS) {
            if let Some(cameras) = data.cameras {
                self.pending.cameras = Some(cameras);
            }
        }
        if outputs.contains(OutputKinds::LANDMARKS) {
            if let Some(landmarks) = data.landmarks {
                self.pending.landmarks = Some(landmarks);
            }
        }
        if outputs.contains(OutputKinds::TRACKS) {
            if let Some(tracks) = data.tracks {
                self.pending.tracks = Some(tracks);
            }
        }
        if outputs.contains(OutputKinds::ACTIVE_FRAME) {
            if let Some(frame) = data.active_frame {
                self.pending.active_frame = Some(frame);
            }
        }

        if self.deadline.is_none() && !self.pending.is_empty() {
            debug!("Arming tool result merge in {:?}", self.delay);
            self.deadline = Some(crossbeam_channel::after(self.delay));
            return true;
        }
        false
    }

    /// Apply everything staged to the scene and clear the staging record.
    ///
    /// Disarms the deadline whether or not anything was staged.
    pub fn merge_into(&mut self, frames: &mut FrameRegistry, scene: &mut SceneState) -> MergeReport {
        self.deadline = None;
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return MergeReport::noop();
        }

        let mut report = MergeReport::default();
        if let Some(cameras) = pending.cameras {
            report.cameras_updated = frames.update_cameras(scene, &cameras);
        }
        if let Some(landmarks) = pending.landmarks {
            scene.replace_landmarks(landmarks);
            report.landmarks_replaced = true;
        }
        if let Some(tracks) = pending.tracks {
            scene.replace_tracks(tracks);
            report.tracks_replaced = true;
        }
        if let Some(frame) = pending.active_frame {
            match scene.set_active_frame(frame, frames.len()) {
                Ok(()) => report.active_frame = Some(frame),
                Err(e) => {
                    warn!("Tool requested active frame: {}", e);
                    report.rejected_active_frame = Some(frame);
                }
            }
        }

        self.merges += 1;
        debug!(
            "Merged tool results: {} cameras, landmarks={}, tracks={}",
            report.cameras_updated.len(),
            report.landmarks_replaced,
            report.tracks_replaced
        );
        report
    }
}

impl Default for ResultCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_DELAY)
    }
}
