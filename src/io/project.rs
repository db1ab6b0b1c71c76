//! JSON project manifest.
//!
//! ```json
//! {
//!   "images": ["frames/0000.png", "frames/0001.png"],
//!   "camera_dir": "krtd",
//!   "tracks": "tracks.csv",
//!   "landmarks": "landmarks.csv",
//!   "depth_maps": { "0": "depth/0000.vti" }
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::DecodeError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub images: Vec<PathBuf>,
    /// Directory holding one `<image stem>.krtd` per image.
    #[serde(default)]
    pub camera_dir: Option<PathBuf>,
    #[serde(default)]
    pub tracks: Option<PathBuf>,
    #[serde(default)]
    pub landmarks: Option<PathBuf>,
    /// Frame index to depth-map path.
    #[serde(default)]
    pub depth_maps: BTreeMap<usize, PathBuf>,
}

impl ProjectManifest {
    /// Load a project manifest, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, DecodeError> {
        let text = fs::read_to_string(path).map_err(|e| DecodeError::io(path, e))?;
        let mut manifest: Self =
            serde_json::from_str(&text).map_err(|source| DecodeError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(base) = path.parent() {
            manifest.resolve_against(base);
        }
        Ok(manifest)
    }

    fn resolve_against(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.images.iter_mut().for_each(resolve);
        self.camera_dir.iter_mut().for_each(resolve);
        self.tracks.iter_mut().for_each(resolve);
        self.landmarks.iter_mut().for_each(resolve);
        self.depth_maps.values_mut().for_each(resolve);
    }

    /// Camera file expected for `image`, if the project has a camera directory.
    pub fn camera_path_for(&self, image: &Path) -> Option<PathBuf> {
        let dir = self.camera_dir.as_ref()?;
        let stem = image.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".krtd");
        Some(dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(
            &path,
            r#"{
                "images": ["img/a.png", "/abs/b.png"],
                "camera_dir": "krtd",
                "tracks": "tracks.csv",
                "depth_maps": {"1": "depth/b.vti"}
            }"#,
        )
        .unwrap();

        let manifest = ProjectManifest::load(&path).unwrap();
        assert_eq!(manifest.images[0], dir.path().join("img/a.png"));
        assert_eq!(manifest.images[1], PathBuf::from("/abs/b.png"));
        assert_eq!(manifest.tracks, Some(dir.path().join("tracks.csv")));
        assert!(manifest.landmarks.is_none());
        assert_eq!(manifest.depth_maps[&1], dir.path().join("depth/b.vti"));
        assert_eq!(
            manifest.camera_path_for(&manifest.images[0]),
            Some(dir.path().join("krtd/a.krtd"))
        );
    }

    #[test]
    fn test_no_camera_dir() {
        let manifest = ProjectManifest::default();
        assert!(manifest.camera_path_for(Path::new("a.png")).is_none());
    }

    #[test]
    fn test_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, "{ images: ").unwrap();
        assert!(matches!(
            ProjectManifest::load(&path),
            Err(DecodeError::Manifest { .. })
        ));
    }
}
