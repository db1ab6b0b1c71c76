//! ActiveFrameProjector - landmark projection and residuals for one frame.
//!
//! A pure function of the scene snapshot: the active camera projects every
//! landmark independently, and each track observed in the active frame with
//! a concrete feature is paired with its projected landmark.

use std::collections::BTreeMap;

use nalgebra::Vector2;

use crate::registry::FrameRegistry;
use crate::scene::{SceneState, TrackId};

use super::view::{ActiveFrameView, PLACEHOLDER_IMAGE_SIZE, ProjectedLandmark, Residual};

#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveFrameProjector;

impl ActiveFrameProjector {
    pub fn new() -> Self {
        Self
    }

    /// Project the landmarks and tracks observed in the active frame.
    pub fn project(&self, scene: &SceneState, frames: &FrameRegistry) -> ActiveFrameView {
        let Some(frame) = scene.active_frame().and_then(|id| frames.get(id)) else {
            return ActiveFrameView::none();
        };

        let mut view = ActiveFrameView {
            frame: Some(frame.id),
            image_path: frame.image_path.clone(),
            depth_map_path: frame.depth_map_path.clone(),
            image_size: frame.known_image_size().unwrap_or(PLACEHOLDER_IMAGE_SIZE),
            has_camera: false,
            landmarks: Vec::new(),
            residuals: Vec::new(),
        };

        // No landmarks or residuals without a pose
        let Some(camera) = scene.camera(frame.id) else {
            return view;
        };
        view.has_camera = true;

        let mut projected: BTreeMap<TrackId, Vector2<f64>> = BTreeMap::new();
        if let Some(landmarks) = scene.landmarks() {
            for (&id, lm) in landmarks.iter() {
                if let Some(loc) = camera.project(&lm.loc) {
                    view.landmarks.push(ProjectedLandmark { id, loc });
                    projected.insert(id, loc);
                }
            }
        }

        if let Some(tracks) = scene.tracks() {
            for track in tracks.iter() {
                let Some(feature) = track.find(frame.id).and_then(|s| s.feature()) else {
                    continue;
                };
                if let Some(&landmark) = projected.get(&track.id) {
                    view.residuals.push(Residual {
                        id: track.id,
                        feature: feature.loc,
                        landmark,
                    });
                }
            }
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use crate::geometry::SE3;
    use crate::scene::{
        Camera, CameraIntrinsics, FrameId, Landmark, LandmarkMap, Track, TrackSet, TrackState,
    };

    fn camera() -> Camera {
        Camera::new(CameraIntrinsics::new(100.0, 100.0, 50.0, 50.0), SE3::identity())
    }

    fn landmarks() -> LandmarkMap {
        let mut map = LandmarkMap::new();
        map.insert(TrackId::new(1), Landmark::new(0.0, 0.0, 2.0));
        map.insert(TrackId::new(2), Landmark::new(1.0, 0.0, 2.0));
        // Behind the camera: silently dropped
        map.insert(TrackId::new(3), Landmark::new(0.0, 0.0, -2.0));
        map
    }

    fn tracks() -> TrackSet {
        let mut bare = Track::new(TrackId::new(2));
        bare.insert(FrameId::new(0), TrackState::Bare);
        TrackSet::new(vec![
            Track::new(TrackId::new(1)).with_feature(FrameId::new(0), 52.0, 49.0),
            bare,
            // Landmark 3 failed to project
            Track::new(TrackId::new(3)).with_feature(FrameId::new(0), 10.0, 10.0),
            // No landmark at all
            Track::new(TrackId::new(4)).with_feature(FrameId::new(0), 0.0, 0.0),
            // Not observed in the active frame
            Track::new(TrackId::new(5)).with_feature(FrameId::new(1), 0.0, 0.0),
        ])
    }

    fn scene_with_camera() -> (SceneState, FrameRegistry) {
        let mut scene = SceneState::new();
        let mut frames = FrameRegistry::new();
        frames.add_frame(&mut scene, Some(camera()), Some("f0.png".into()));
        scene.set_active_frame(FrameId::new(0), frames.len()).unwrap();
        (scene, frames)
    }

    #[test]
    fn test_no_active_frame() {
        let scene = SceneState::new();
        let frames = FrameRegistry::new();
        let view = ActiveFrameProjector::new().project(&scene, &frames);
        assert_eq!(view, ActiveFrameView::none());
        assert_eq!(view.image_size, (1, 1));
    }

    #[test]
    fn test_frame_without_camera_is_empty() {
        let mut scene = SceneState::new();
        let mut frames = FrameRegistry::new();
        frames.add_image_frame(&mut scene, "a.png".into());
        scene.set_active_frame(FrameId::new(0), frames.len()).unwrap();
        scene.replace_landmarks(Arc::new(landmarks()));

        let view = ActiveFrameProjector::new().project(&scene, &frames);
        assert!(!view.has_camera);
        assert!(view.is_empty());
        assert_eq!(view.image_size, (1, 1));
        assert_eq!(view.frame, Some(FrameId::new(0)));
    }

    #[test]
    fn test_camera_without_landmarks_is_empty() {
        let (scene, frames) = scene_with_camera();
        let view = ActiveFrameProjector::new().project(&scene, &frames);
        assert!(view.has_camera);
        assert!(view.landmarks.is_empty());
        assert!(view.residuals.is_empty());
    }

    #[test]
    fn test_projection_and_residuals() {
        let (mut scene, frames) = scene_with_camera();
        scene.replace_landmarks(Arc::new(landmarks()));
        scene.replace_tracks(Arc::new(tracks()));

        let view = ActiveFrameProjector::new().project(&scene, &frames);

        let ids: Vec<TrackId> = view.landmarks.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![TrackId::new(1), TrackId::new(2)]);
        assert_relative_eq!(view.landmarks[1].loc, Vector2::new(100.0, 50.0), epsilon = 1e-12);

        assert_eq!(view.residuals.len(), 1);
        let r = &view.residuals[0];
        assert_eq!(r.id, TrackId::new(1));
        assert_relative_eq!(r.feature, Vector2::new(52.0, 49.0), epsilon = 1e-12);
        assert_relative_eq!(r.landmark, Vector2::new(50.0, 50.0), epsilon = 1e-12);
        assert_relative_eq!(r.error(), 5.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let (mut scene, frames) = scene_with_camera();
        scene.replace_landmarks(Arc::new(landmarks()));
        scene.replace_tracks(Arc::new(tracks()));

        let projector = ActiveFrameProjector::new();
        let first = projector.project(&scene, &frames);
        let second = projector.project(&scene, &frames);
        assert_eq!(first, second);
    }

    #[test]
    fn test_image_size_falls_back_to_camera() {
        let mut scene = SceneState::new();
        let mut frames = FrameRegistry::new();
        let cam = Camera::new(
            CameraIntrinsics::new(100.0, 100.0, 50.0, 50.0).with_image_size(100, 80),
            SE3::identity(),
        );
        frames.add_frame(&mut scene, Some(cam), None);
        scene.set_active_frame(FrameId::new(0), frames.len()).unwrap();

        let view = ActiveFrameProjector::new().project(&scene, &frames);
        assert_eq!(view.image_size, (100, 80));
    }
}
