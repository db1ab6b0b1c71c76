//! Geometry utilities: rigid-body transforms shared by cameras and tools.

pub mod se3;

pub use se3::SE3;
