/// Canvas geometry - the fixed logical render surface
pub mod canvas {
    /// Logical canvas width in pixels
    pub const WIDTH: f32 = 640.0;
    /// Logical canvas height in pixels
    pub const HEIGHT: f32 = 480.0;
    /// Number of lanes the road is divided into
    pub const LANE_COUNT: usize = 3;
    /// Width of a single lane
    pub const LANE_WIDTH: f32 = WIDTH / LANE_COUNT as f32;
}

/// Player car constants
pub mod player {
    use super::canvas;

    /// Side length of the player (and obstacle) collision box
    pub const CAR_SIZE: f32 = 60.0;
    /// Fixed vertical position of the player's top edge
    pub const Y: f32 = canvas::HEIGHT - 100.0;
}

/// Obstacle constants
pub mod obstacle {
    /// Vertical position of a freshly spawned obstacle (above the canvas)
    pub const SPAWN_Y: f32 = -50.0;
    /// Leading-edge margin used by the vertical overlap test
    pub const COLLISION_MARGIN: f32 = 40.0;
    /// Added to the game speed to get per-tick vertical motion
    pub const BASE_STEP: u32 = 2;
}

/// Spawn timing constants
pub mod spawn {
    /// Spawn threshold at speed 0 (ticks)
    pub const BASE_THRESHOLD: u32 = 60;
    /// Threshold reduction per speed unit
    pub const PER_SPEED: u32 = 3;
}

/// Tunable ranges for user-adjustable settings
pub mod limits {
    pub const SENSITIVITY_MIN: u32 = 2;
    pub const SENSITIVITY_MAX: u32 = 20;
    pub const SENSITIVITY_DEFAULT: u32 = 8;

    pub const SPEED_MIN: u32 = 1;
    pub const SPEED_MAX: u32 = 10;
    pub const SPEED_DEFAULT: u32 = 5;
}

/// Reason recorded when the player hits an obstacle
pub const CRASH_REASON: &str = "CRASHED!";
/// Reason recorded when a running game is stopped by command
pub const STOP_REASON: &str = "STOPPED";

/// Ticks that pass between obstacle spawns at the given speed.
///
/// Higher speed spawns more often: speed 1 gives 57, speed 10 gives 30.
#[inline]
pub fn spawn_threshold(speed: u32) -> u32 {
    spawn::BASE_THRESHOLD.saturating_sub(spawn::PER_SPEED * speed)
}

/// Vertical distance an obstacle travels per tick at the given speed
#[inline]
pub fn obstacle_step(speed: u32) -> f32 {
    (speed + obstacle::BASE_STEP) as f32
}
