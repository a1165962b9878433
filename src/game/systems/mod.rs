pub mod obstacles;
pub mod spawn;
