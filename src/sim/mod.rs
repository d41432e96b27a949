//! Deterministic fixed-tick simulation core

pub mod constants;
pub mod context;
pub mod entity;
pub mod events;
pub mod pool;
pub mod spatial;
pub mod systems;
