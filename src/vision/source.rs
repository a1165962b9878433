//! Frame source abstraction
//!
//! Both providers answer `poll()` with the most recent frame they can offer
//! right now, or `None`. A missing frame is never an error for the caller.

use crate::vision::frame::Frame;
use crate::vision::local::LocalFrameSource;
use crate::vision::remote::RemoteFrameSource;

/// Something that can be asked for the latest video frame
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Latest available frame, or `None` for "no signal this tick"
    async fn poll(&self) -> Option<Frame>;
}

/// The provider chosen by configuration
pub enum Camera {
    Remote(RemoteFrameSource),
    Local(LocalFrameSource),
}

impl Camera {
    pub fn name(&self) -> &'static str {
        match self {
            Camera::Remote(_) => "remote",
            Camera::Local(_) => "local",
        }
    }
}

impl FrameSource for Camera {
    async fn poll(&self) -> Option<Frame> {
        match self {
            Camera::Remote(source) => source.poll().await,
            Camera::Local(source) => source.poll().await,
        }
    }
}
