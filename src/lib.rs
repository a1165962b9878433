//! Tilt Racer
//!
//! A three-lane dodging game steered by head tilt. Each loop iteration pulls
//! a camera frame, finds the player's face, turns the eye line angle into a
//! lane, advances the game by one tick and draws the result.

pub mod config;
pub mod game;
pub mod metrics;
pub mod render;
pub mod session;
pub mod tracking;
pub mod vision;
