pub mod error;
pub mod geometry;
pub mod io;
pub mod projection;
pub mod registry;
pub mod scene;
pub mod system;
pub mod tools;
pub mod view;
