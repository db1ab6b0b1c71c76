//! Moves the scene so the landmark centroid sits at the world origin.

use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::SE3;
use crate::scene::{Camera, CameraMap, LandmarkMap, landmark_centroid};
use crate::tools::tool::{OutputKinds, Tool, ToolContext, ToolData, ToolInputs};

/// Re-expresses cameras and landmarks in a frame centred on the landmark
/// centroid. Projections are unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalTransformTool;

impl CanonicalTransformTool {
    pub const NAME: &'static str = "canonical-transform";
}

fn shift_camera(camera: &Camera, offset: &Vector3<f64>) -> Camera {
    let shift = SE3::from_translation(-offset);
    let mut shifted = camera.clone();
    shifted.set_pose(shift.compose(camera.pose()));
    shifted
}

impl Tool for CanonicalTransformTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn outputs(&self) -> OutputKinds {
        OutputKinds::CAMERAS | OutputKinds::LANDMARKS
    }

    fn accepts(&self, inputs: &ToolInputs) -> bool {
        inputs.has_landmarks()
    }

    fn run(&mut self, inputs: ToolInputs, ctx: &ToolContext) -> anyhow::Result<()> {
        let landmarks = inputs
            .landmarks
            .ok_or_else(|| anyhow::anyhow!("no landmarks to transform"))?;
        let centroid = landmark_centroid(&landmarks)
            .ok_or_else(|| anyhow::anyhow!("landmark set is empty"))?;
        debug!("Recentering scene on landmark centroid {:?}", centroid);

        let shifted_landmarks: LandmarkMap = landmarks
            .iter()
            .map(|(&id, lm)| {
                let mut lm = *lm;
                lm.loc -= centroid;
                (id, lm)
            })
            .collect();
        let shifted_cameras: CameraMap = inputs
            .cameras
            .iter()
            .map(|(&id, camera)| (id, shift_camera(camera, &centroid)))
            .collect();

        ctx.set_data(
            ToolData::default()
                .with_cameras(shifted_cameras)
                .with_landmarks(shifted_landmarks),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    use crate::scene::{CameraIntrinsics, FrameId, Landmark, TrackId};
    use crate::tools::tool::detached_context;

    fn scene_inputs() -> ToolInputs {
        let landmarks: LandmarkMap = [
            (TrackId::new(0), Landmark::new(1.0, 2.0, 10.0)),
            (TrackId::new(1), Landmark::new(3.0, -2.0, 12.0)),
        ]
        .into_iter()
        .collect();
        let pose = SE3::new(
            UnitQuaternion::from_euler_angles(0.05, -0.1, 0.2),
            Vector3::new(0.5, 0.0, -1.0),
        );
        let camera = Camera::new(CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0), pose);
        let cameras: CameraMap = [(FrameId::new(0), camera)].into_iter().collect();
        ToolInputs {
            cameras: Arc::new(cameras),
            landmarks: Some(Arc::new(landmarks)),
            ..ToolInputs::default()
        }
    }

    #[test]
    fn test_declines_without_landmarks() {
        assert!(!CanonicalTransformTool.accepts(&ToolInputs::default()));
        assert!(CanonicalTransformTool.accepts(&scene_inputs()));
        assert!(!CanonicalTransformTool.is_cancelable());
    }

    #[test]
    fn test_centroid_moves_to_origin_and_projections_hold() {
        let inputs = scene_inputs();
        let before_cam = inputs.cameras[&FrameId::new(0)].clone();
        let before_lms = inputs.landmarks.clone().unwrap();
        let (ctx, _rx) = detached_context();

        CanonicalTransformTool.run(inputs, &ctx).unwrap();
        let data = ctx.data();
        let after_lms = data.landmarks.unwrap();
        let after_cams = data.cameras.unwrap();
        let after_cam = &after_cams[&FrameId::new(0)];

        let centroid = landmark_centroid(&after_lms).unwrap();
        assert_relative_eq!(centroid, Vector3::zeros(), epsilon = 1e-12);

        for (id, lm) in before_lms.iter() {
            let uv_before = before_cam.project(&lm.loc).unwrap();
            let uv_after = after_cam.project(&after_lms[id].loc).unwrap();
            assert_relative_eq!(uv_before, uv_after, epsilon = 1e-9);
        }
    }
}
