//! Obstacle motion, collision and off-screen cleanup

use crate::game::constants::obstacle_step;
use crate::game::state::GameState;

/// Result of one motion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionOutcome {
    /// Obstacles removed after leaving the canvas
    pub cleared: u32,
    /// The player was hit; the pass stopped at that obstacle
    pub crashed: bool,
}

/// Move the first `count` obstacles and resolve collisions.
///
/// Obstacles are visited in reverse index order so removal never shifts an
/// obstacle that has not been visited yet. Anything pushed after index
/// `count` (this tick's spawn) is left where it is.
pub fn update(state: &mut GameState, count: usize) -> MotionOutcome {
    let step = obstacle_step(state.speed);
    let lane = state.player_lane;
    let mut outcome = MotionOutcome::default();

    for i in (0..count.min(state.obstacles.len())).rev() {
        let obs = &mut state.obstacles[i];
        obs.y += step;

        if obs.hits(lane) {
            outcome.crashed = true;
            return outcome;
        }

        if obs.off_screen() {
            state.obstacles.remove(i);
            outcome.cleared += 1;
        }
    }

    outcome
}
