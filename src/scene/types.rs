//! Core ID types for frames and tracks.

/// Dense, 0-based identifier of a reconstruction frame.
///
/// FrameIds are assigned sequentially by the frame registry at the first
/// arrival of either a camera or an image and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Identifier of a feature track.
///
/// Landmarks are keyed by the id of the track they were triangulated from,
/// which is what lets a track observation be paired with a projected
/// landmark when computing residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub u64);

impl TrackId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_ordering() {
        assert!(FrameId::new(1) < FrameId::new(2));
        assert_eq!(FrameId::new(7).index(), 7);
    }

    #[test]
    fn test_track_id_display() {
        assert_eq!(format!("{}", TrackId::new(12)), "T12");
        assert_eq!(format!("{}", FrameId::new(3)), "F3");
    }
}
