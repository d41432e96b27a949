//! Per-tick simulation systems, run in a fixed order by the context

pub mod ai;
pub mod collision;
pub mod drones;
pub mod movement;
pub mod skills;
pub mod weapons;
