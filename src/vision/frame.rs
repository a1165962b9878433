//! Captured video frames

use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Compressed image as served by the camera (usually JPEG)
    Encoded,
    /// Packed 8-bit RGB, row-major
    Rgb24 { width: u32, height: u32 },
}

/// An immutable frame handle; cloning shares the payload
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<[u8]>,
    pub format: FrameFormat,
    pub captured_at: Instant,
}

impl Frame {
    pub fn encoded(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            format: FrameFormat::Encoded,
            captured_at: Instant::now(),
        }
    }

    pub fn rgb24(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            format: FrameFormat::Rgb24 { width, height },
            captured_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel at (x, y) for raw frames; `None` for encoded or out-of-range
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let FrameFormat::Rgb24 { width, height } = self.format else {
            return None;
        };
        if x >= width || y >= height {
            return None;
        }
        let i = ((y * width + x) * 3) as usize;
        let px = self.data.get(i..i + 3)?;
        Some([px[0], px[1], px[2]])
    }
}
