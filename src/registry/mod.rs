//! Frame bookkeeping: the dense frame collection and the orphan-queue
//! pairing of camera and image arrivals.

mod frame;
mod frame_registry;

pub use frame::Frame;
pub use frame_registry::{FrameChange, FrameRegistry};
