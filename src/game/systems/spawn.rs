//! Obstacle spawning
//!
//! The spawn timer counts running ticks; once it passes the speed-dependent
//! threshold a single obstacle is dropped into a random lane and the timer
//! starts over.

use rand::Rng;

use crate::game::constants::spawn_threshold;
use crate::game::state::{GameState, Lane, Obstacle};

/// Advance the spawn timer, spawning at most one obstacle.
///
/// Returns the lane of the new obstacle, if one was spawned.
pub fn update<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> Option<Lane> {
    state.spawn_timer += 1;

    if state.spawn_timer <= spawn_threshold(state.speed) {
        return None;
    }

    let lane = random_lane(rng);
    state.obstacles.push(Obstacle::new(lane));
    state.spawn_timer = 0;
    Some(lane)
}

/// Pick one of the three lanes uniformly
pub fn random_lane<R: Rng + ?Sized>(rng: &mut R) -> Lane {
    Lane::ALL[rng.gen_range(0..Lane::ALL.len())]
}
