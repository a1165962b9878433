//! Game state definitions
//!
//! `GameState` is owned by the session and handed by reference to the
//! simulation (mutably) and the renderer (immutably).

use serde::{Deserialize, Serialize};

use crate::game::constants::{canvas, limits, obstacle, player};

/// One of the three horizontal tracks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Left,
    #[default]
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Lane index: 0 = left, 1 = center, 2 = right
    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Center => 1,
            Lane::Right => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Lane> {
        Lane::ALL.get(index).copied()
    }

    /// Horizontal center of the lane on the canvas
    pub fn center_x(self) -> f32 {
        self.index() as f32 * canvas::LANE_WIDTH + canvas::LANE_WIDTH / 2.0
    }

    /// Left edge of a car-sized box centred in this lane
    pub fn car_x(self) -> f32 {
        self.center_x() - player::CAR_SIZE / 2.0
    }
}

/// A falling obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub lane: Lane,
    /// Top edge; increases toward the player
    pub y: f32,
}

impl Obstacle {
    pub fn new(lane: Lane) -> Self {
        Self {
            lane,
            y: obstacle::SPAWN_Y,
        }
    }

    /// Whether this obstacle overlaps the player's collision band in `lane`
    pub fn hits(&self, lane: Lane) -> bool {
        self.lane == lane
            && self.y + obstacle::COLLISION_MARGIN > player::Y
            && self.y < player::Y + player::CAR_SIZE
    }

    /// Whether the obstacle has scrolled past the bottom of the canvas
    pub fn off_screen(&self) -> bool {
        self.y > canvas::HEIGHT
    }
}

/// Simulation phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Before the first start command
    Idle,
    /// Ticking
    Running,
    /// Halted; score frozen
    GameOver { reason: String },
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: Phase,
    /// Ticks survived in the current run
    pub score: u64,
    /// Obstacles in spawn order
    pub obstacles: Vec<Obstacle>,
    pub player_lane: Lane,
    /// Ticks since the last spawn
    pub spawn_timer: u32,
    /// Configured speed, 1-10
    pub speed: u32,
}

impl GameState {
    pub fn new(speed: u32) -> Self {
        Self {
            phase: Phase::Idle,
            score: 0,
            obstacles: Vec::new(),
            player_lane: Lane::Center,
            spawn_timer: 0,
            speed: speed.clamp(limits::SPEED_MIN, limits::SPEED_MAX),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Enter Running from any phase, clearing the previous run.
    ///
    /// The player lane is tilt-driven and survives the reset.
    pub fn start(&mut self) {
        self.score = 0;
        self.obstacles.clear();
        self.spawn_timer = 0;
        self.phase = Phase::Running;
    }

    /// Halt the run, keeping the final score
    pub fn end(&mut self, reason: &str) {
        self.phase = Phase::GameOver {
            reason: reason.to_string(),
        };
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(limits::SPEED_MIN, limits::SPEED_MAX);
    }

    /// Reason the last run ended, if it has
    pub fn game_over_reason(&self) -> Option<&str> {
        match &self.phase {
            Phase::GameOver { reason } => Some(reason),
            _ => None,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(limits::SPEED_DEFAULT)
    }
}
