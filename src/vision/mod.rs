//! Video frame acquisition

pub mod frame;
pub mod local;
pub mod remote;
pub mod source;

pub use frame::{Frame, FrameFormat};
pub use source::{Camera, FrameSource};
