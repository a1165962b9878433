//! Local capture device frame source
//!
//! A capture backend pushes frames into a `CaptureFeed`; the paired
//! `LocalFrameSource` always hands out the newest one. Until the first frame
//! arrives the device is "not ready" and polls return `None`.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::vision::frame::Frame;
use crate::vision::source::FrameSource;

/// Preferred capture resolution
pub const PREFERRED_WIDTH: u32 = 640;
pub const PREFERRED_HEIGHT: u32 = 480;

/// Writer half, held by the capture backend
pub struct CaptureFeed {
    tx: watch::Sender<Option<Frame>>,
}

impl CaptureFeed {
    /// Publish a new frame. Returns false once the source has been dropped.
    pub fn push(&self, frame: Frame) -> bool {
        self.tx.send(Some(frame)).is_ok()
    }
}

/// Reader half, polled by the control loop
pub struct LocalFrameSource {
    rx: watch::Receiver<Option<Frame>>,
}

impl LocalFrameSource {
    /// Whether the device has produced at least one frame
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

impl FrameSource for LocalFrameSource {
    async fn poll(&self) -> Option<Frame> {
        self.rx.borrow().clone()
    }
}

/// Create a connected feed/source pair
pub fn capture_channel() -> (CaptureFeed, LocalFrameSource) {
    let (tx, rx) = watch::channel(None);
    (CaptureFeed { tx }, LocalFrameSource { rx })
}

/// Synthetic capture device producing a moving test pattern.
///
/// Stands in for a platform camera, which is outside this crate.
pub struct TestPatternDevice {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for TestPatternDevice {
    fn default() -> Self {
        Self {
            width: PREFERRED_WIDTH,
            height: PREFERRED_HEIGHT,
            fps: 30,
        }
    }
}

impl TestPatternDevice {
    /// Render pattern frame `n`: a dim gradient with a bright bar sweeping down
    pub fn frame(&self, n: u64) -> Frame {
        let (w, h) = (self.width as usize, self.height as usize);
        let bar = (n as usize * 4) % h.max(1);
        let mut data = vec![0u8; w * h * 3];

        for (y, row) in data.chunks_exact_mut(w * 3).enumerate() {
            let shade = if y.abs_diff(bar) < 6 { 200 } else { (y * 64 / h.max(1)) as u8 };
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                px[0] = shade;
                px[1] = shade / 2 + (x * 32 / w.max(1)) as u8;
                px[2] = shade;
            }
        }

        Frame::rgb24(self.width, self.height, data)
    }

    /// Run the device on its own task until the source is dropped
    pub fn spawn(self, feed: CaptureFeed) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = Duration::from_secs_f64(1.0 / self.fps.max(1) as f64);
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                "Test pattern capture started: {}x{} @ {} fps",
                self.width, self.height, self.fps
            );

            let mut n: u64 = 0;
            loop {
                ticker.tick().await;
                if !feed.push(self.frame(n)) {
                    debug!("Capture source dropped, stopping test pattern");
                    return;
                }
                n += 1;
            }
        })
    }
}
