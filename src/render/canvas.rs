//! Software presentation surface
//!
//! Rasterises draw commands into a fixed 640x480 ARGB buffer. Text is not
//! rasterised; the strings of the last presented frame are kept instead so
//! a host UI (or a log line) can show them.

use crate::game::constants::canvas;
use crate::render::commands::{Color, DrawCommand};
use crate::vision::{Frame, FrameFormat};

/// Placeholder shade for compressed frames, which are not decoded here
const ENCODED_FRAME_FILL: u32 = 0xFF202020;

/// Anything that can display a draw list
pub trait Surface {
    fn present(&mut self, commands: &[DrawCommand]);
}

/// In-memory framebuffer.
///
/// Only raw RGB24 frames are blitted. Compressed frames (JPEG stills from the
/// remote camera) are not decoded; their slot gets a flat dark fill, which is
/// distinct from the "Waiting for Camera..." placeholder.
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    text: Vec<String>,
    frames_presented: u64,
}

impl Canvas {
    pub fn new() -> Self {
        let width = canvas::WIDTH as usize;
        let height = canvas::HEIGHT as usize;
        Self {
            width,
            height,
            pixels: vec![0xFF000000; width * height],
            text: Vec::new(),
            frames_presented: 0,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Text strings of the last presented frame, in draw order
    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn blend(&mut self, x: usize, y: usize, color: Color) {
        let i = y * self.width + x;
        if color.is_opaque() {
            self.pixels[i] = color.to_argb();
            return;
        }

        let dst = self.pixels[i];
        let a = color.a as u32;
        let mix = |src: u8, shift: u32| {
            let d = (dst >> shift) & 0xFF;
            (src as u32 * a + d * (255 - a)) / 255
        };
        self.pixels[i] = 0xFF000000 | mix(color.r, 16) << 16 | mix(color.g, 8) << 8 | mix(color.b, 0);
    }

    /// Clip a float span to pixel indices [start, end)
    fn span(lo: f32, hi: f32, limit: usize) -> (usize, usize) {
        let start = lo.floor().max(0.0) as usize;
        let end = (hi.ceil().max(0.0) as usize).min(limit);
        (start.min(limit), end)
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let (x0, x1) = Self::span(x, x + w, self.width);
        let (y0, y1) = Self::span(y, y + h, self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color);
            }
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        let (x0, x1) = Self::span(cx - radius, cx + radius, self.width);
        let (y0, y1) = Self::span(cy - radius, cy + radius, self.height);
        let r2 = radius * radius;
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.blend(px, py, color);
                }
            }
        }
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Color) {
        let half = width / 2.0;
        if x0 == x1 {
            self.fill_rect(x0 - half, y0.min(y1), width, (y1 - y0).abs(), color);
        } else if y0 == y1 {
            self.fill_rect(x0.min(x1), y0 - half, (x1 - x0).abs(), width, color);
        } else {
            let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil() as usize;
            for s in 0..=steps {
                let t = s as f32 / steps as f32;
                let x = x0 + (x1 - x0) * t;
                let y = y0 + (y1 - y0) * t;
                self.fill_rect(x - half, y - half, width, width, color);
            }
        }
    }

    fn blit(&mut self, frame: &Frame, x: f32, y: f32, w: f32, h: f32) {
        let (dx0, dx1) = Self::span(x, x + w, self.width);
        let (dy0, dy1) = Self::span(y, y + h, self.height);

        let FrameFormat::Rgb24 { width, height } = frame.format else {
            for py in dy0..dy1 {
                self.pixels[py * self.width + dx0..py * self.width + dx1].fill(ENCODED_FRAME_FILL);
            }
            return;
        };

        for py in dy0..dy1 {
            let sy = (((py as f32 + 0.5 - y) / h) * height as f32) as u32;
            for px in dx0..dx1 {
                let sx = (((px as f32 + 0.5 - x) / w) * width as f32) as u32;
                if let Some([r, g, b]) = frame.rgb_at(sx, sy) {
                    self.pixels[py * self.width + px] = Color::rgb(r, g, b).to_argb();
                }
            }
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for Canvas {
    fn present(&mut self, commands: &[DrawCommand]) {
        self.text.clear();
        for command in commands {
            match command {
                DrawCommand::Frame { frame, x, y, w, h } => self.blit(frame, *x, *y, *w, *h),
                DrawCommand::FillRect { x, y, w, h, color } => self.fill_rect(*x, *y, *w, *h, *color),
                DrawCommand::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    width,
                    color,
                } => self.line(*x0, *y0, *x1, *y1, *width, *color),
                DrawCommand::FillCircle { cx, cy, radius, color } => {
                    self.fill_circle(*cx, *cy, *radius, *color)
                }
                DrawCommand::Text { text, .. } => self.text.push(text.clone()),
            }
        }
        self.frames_presented += 1;
    }
}
