pub mod constants;
pub mod simulation;
pub mod state;
pub mod systems;
