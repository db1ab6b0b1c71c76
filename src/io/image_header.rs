//! Image size from the file header, without decoding pixels.

use std::path::Path;

use crate::error::DecodeError;

/// Read the width and height of an image from its file header.
pub fn read_image_size(path: &Path) -> Result<(u32, u32), DecodeError> {
    image::image_dimensions(path).map_err(|source| DecodeError::Image {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_png_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        image::RgbImage::new(32, 24).save(&path).unwrap();
        assert_eq!(read_image_size(&path).unwrap(), (32, 24));
    }

    #[test]
    fn test_read_size_of_missing_file() {
        let err = read_image_size(Path::new("/nonexistent/img.png")).unwrap_err();
        assert!(matches!(err, DecodeError::Image { .. }));
    }
}
