//! Tools shipped with the viewer.

mod canonical_transform;
mod track_filter;

pub use canonical_transform::CanonicalTransformTool;
pub use track_filter::{TrackFilterConfig, TrackFilterTool};

use super::tool::Tool;

/// Look up a builtin tool by its command-line name.
pub fn by_name(name: &str) -> Option<Box<dyn Tool>> {
    match name {
        TrackFilterTool::NAME => Some(Box::new(TrackFilterTool::default())),
        CanonicalTransformTool::NAME => Some(Box::new(CanonicalTransformTool)),
        _ => None,
    }
}

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &[TrackFilterTool::NAME, CanonicalTransformTool::NAME];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        for name in NAMES {
            assert_eq!(by_name(name).unwrap().name(), *name);
        }
        assert!(by_name("bundle-adjust").is_none());
    }
}
