//! Active-frame projection: landmarks and feature/landmark residuals as seen
//! from the currently viewed frame.

mod projector;
mod view;

pub use projector::ActiveFrameProjector;
pub use view::{ActiveFrameView, PLACEHOLDER_IMAGE_SIZE, ProjectedLandmark, Residual};
