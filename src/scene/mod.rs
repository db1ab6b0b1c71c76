//! Scene data: cameras, feature tracks, landmarks and the canonical
//! [`SceneState`] snapshot that ties them together.

pub mod camera;
pub mod landmark;
pub mod state;
pub mod track;
pub mod types;

pub use camera::{Camera, CameraIntrinsics};
pub use landmark::{Landmark, LandmarkMap, landmark_centroid};
pub use state::{CameraMap, SceneState};
pub use track::{Feature, Track, TrackSet, TrackState};
pub use types::{FrameId, TrackId};
