//! Draw command list produced by the renderer

use crate::vision::Frame;

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Packed 0xAARRGGBB
    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

/// Palette
pub mod palette {
    use super::Color;

    pub const NO_SIGNAL: Color = Color::rgb(0x33, 0x33, 0x33);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const HINT: Color = Color::rgb(0xAA, 0xAA, 0xAA);
    pub const TRACKER: Color = Color::rgb(0x00, 0xFF, 0x00);
    pub const ROAD_LINE: Color = Color::rgba(0xFF, 0xFF, 0xFF, 77);
    pub const PLAYER: Color = Color::rgb(0x00, 0xD2, 0xFF);
    pub const OBSTACLE: Color = Color::rgb(0xFF, 0x00, 0x55);
    pub const LANE_IDLE: Color = Color::rgb(0x33, 0x33, 0x33);
    pub const LANE_ACTIVE: Color = Color::rgb(0xFF, 0xD7, 0x00);
    pub const OVERLAY: Color = Color::rgba(0x00, 0x00, 0x00, 204);
}

/// Horizontal anchor for text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One primitive in canvas coordinates
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Camera frame scaled into the given rectangle
    Frame {
        frame: Frame,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    },
    Line {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        color: Color,
    },
    FillCircle {
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        align: Align,
        color: Color,
        text: String,
    },
}

impl DrawCommand {
    /// Text payload, if this is a text command
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawCommand::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}
