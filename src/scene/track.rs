//! Feature tracks: per-frame observations of a single scene point.

use std::collections::BTreeMap;

use nalgebra::Vector2;

use super::types::{FrameId, TrackId};

/// A detected image feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    pub loc: Vector2<f64>,
}

impl Feature {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            loc: Vector2::new(x, y),
        }
    }
}

/// One observation of a track in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackState {
    /// Observation carrying a concrete feature location.
    Feature(Feature),
    /// The track is known to be present in the frame but has no feature
    /// attached (e.g. the descriptor-only states some trackers emit).
    Bare,
}

impl TrackState {
    pub fn feature(&self) -> Option<&Feature> {
        match self {
            TrackState::Feature(f) => Some(f),
            TrackState::Bare => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    states: BTreeMap<FrameId, TrackState>,
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            states: BTreeMap::new(),
        }
    }

    /// Insert (or replace) the observation at `frame`.
    pub fn insert(&mut self, frame: FrameId, state: TrackState) {
        self.states.insert(frame, state);
    }

    pub fn with_feature(mut self, frame: FrameId, x: f64, y: f64) -> Self {
        self.insert(frame, TrackState::Feature(Feature::new(x, y)));
        self
    }

    pub fn find(&self, frame: FrameId) -> Option<&TrackState> {
        self.states.get(&frame)
    }

    pub fn states(&self) -> impl Iterator<Item = (FrameId, &TrackState)> {
        self.states.iter().map(|(f, s)| (*f, s))
    }

    /// Number of frames the track is observed in.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first_frame(&self) -> Option<FrameId> {
        self.states.keys().next().copied()
    }

    pub fn last_frame(&self) -> Option<FrameId> {
        self.states.keys().next_back().copied()
    }
}

/// The full set of feature tracks. Replaced wholesale, never edited in place
/// once published to the scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSet {
    tracks: Vec<Track>,
}

impl TrackSet {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

impl FromIterator<Track> for TrackSet {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
