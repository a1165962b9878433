//! Rendering: scene to draw commands, and a software surface to show them

pub mod canvas;
pub mod commands;
pub mod renderer;

pub use canvas::{Canvas, Surface};
pub use commands::{Color, DrawCommand};
pub use renderer::{render, Scene};
