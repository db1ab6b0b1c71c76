//! Landmarks: triangulated 3D points keyed by their originating track.

use std::collections::BTreeMap;

use nalgebra::Vector3;

use super::types::TrackId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub loc: Vector3<f64>,
    /// Number of observations the landmark was estimated from, if known.
    pub observations: u32,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            loc: Vector3::new(x, y, z),
            observations: 0,
        }
    }
}

/// Ordered map from track id to landmark.
pub type LandmarkMap = BTreeMap<TrackId, Landmark>;

/// Centroid of all landmark positions, or `None` for an empty map.
pub fn landmark_centroid(landmarks: &LandmarkMap) -> Option<Vector3<f64>> {
    if landmarks.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = landmarks.values().map(|lm| lm.loc).sum();
    Some(sum / landmarks.len() as f64)
}
