//! File codecs for cameras, tracks, landmarks, images and project manifests.
//!
//! Every reader fails with a [`DecodeError`](crate::error::DecodeError);
//! callers treat that as "data unavailable for this frame", never as fatal.

pub mod image_header;
pub mod krtd;
pub mod landmarks;
pub mod project;
pub mod tracks;

pub use image_header::read_image_size;
pub use krtd::{format_krtd, parse_krtd, read_krtd, write_krtd};
pub use landmarks::{read_landmarks, write_landmarks};
pub use project::ProjectManifest;
pub use tracks::{read_tracks, write_tracks};
