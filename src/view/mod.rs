//! Renderer contract: what the core pushes to the camera and world views.
//!
//! Sinks are pure consumers; nothing they do feeds back into the scene.

mod recording;
#[cfg(feature = "rerun")]
mod rerun_sink;

pub use recording::{RecordingSink, SinkCall};
#[cfg(feature = "rerun")]
pub use rerun_sink::RerunSink;

use std::path::Path;

use crate::projection::ActiveFrameView;
use crate::scene::{Camera, FrameId, TrackId};

/// Destination for everything the viewer displays.
pub trait ViewSink {
    /// A frame's camera was added or replaced.
    fn add_camera(&mut self, id: FrameId, camera: &Camera);

    fn set_active_frame(&mut self, id: Option<FrameId>);

    fn add_landmark(&mut self, id: TrackId, x: f64, y: f64);

    fn add_residual(&mut self, id: TrackId, fx: f64, fy: f64, lx: f64, ly: f64);

    fn clear_landmarks(&mut self);

    fn clear_residuals(&mut self);

    /// Backdrop image for the camera view; `path` is `None` for frames
    /// without an image.
    fn set_image(&mut self, _path: Option<&Path>, _size: (u32, u32)) {}

    /// End of one refresh; buffering sinks publish here.
    fn flush(&mut self) {}
}

/// Replace the camera view contents with `view`.
pub fn present<S: ViewSink + ?Sized>(view: &ActiveFrameView, sink: &mut S) {
    sink.clear_landmarks();
    sink.clear_residuals();
    sink.set_active_frame(view.frame);
    sink.set_image(view.image_path.as_deref(), view.image_size);
    for lm in &view.landmarks {
        sink.add_landmark(lm.id, lm.loc.x, lm.loc.y);
    }
    for r in &view.residuals {
        sink.add_residual(r.id, r.feature.x, r.feature.y, r.landmark.x, r.landmark.y);
    }
    sink.flush();
}
