//! Per-tick game simulation
//!
//! Runs the systems in a fixed order against a borrowed `GameState`:
//! score, spawn, then obstacle motion/collision. Nothing happens outside
//! the Running phase.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::game::constants::CRASH_REASON;
use crate::game::state::{GameState, Lane};
use crate::game::systems::{obstacles, spawn};

/// Events emitted by a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    ObstacleSpawned { lane: Lane },
    /// Obstacles that scrolled off the bottom this tick
    ObstaclesCleared { count: u32 },
    Crashed { score: u64 },
}

/// Owns the randomness used by the spawn rule
pub struct Simulation {
    rng: StdRng,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic simulation for tests and benchmarks
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advance the game by exactly one tick
    pub fn tick(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !state.is_running() {
            return events;
        }

        state.score += 1;

        // Obstacles spawned this tick start moving next tick
        let existing = state.obstacles.len();
        if let Some(lane) = spawn::update(state, &mut self.rng) {
            debug!("Spawned obstacle in lane {}", lane.index());
            events.push(GameEvent::ObstacleSpawned { lane });
        }

        let outcome = obstacles::update(state, existing);
        if outcome.cleared > 0 {
            events.push(GameEvent::ObstaclesCleared {
                count: outcome.cleared,
            });
        }

        if outcome.crashed {
            state.end(CRASH_REASON);
            info!("Crashed in lane {}, final score {}", state.player_lane.index(), state.score);
            events.push(GameEvent::Crashed { score: state.score });
        }

        events
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
