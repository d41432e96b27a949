//! Arena Core
//!
//! Deterministic fixed-tick simulation core for a top-down multiplayer
//! arena shooter: swept-collision physics over a spatial hash, pooled
//! entities, data-driven weapons and skills, and host-authoritative
//! networking with client-side prediction.

pub mod catalog;
pub mod config;
pub mod net;
pub mod sim;
pub mod util;
