//! Drone companions
//!
//! Drones run an explicit mode machine driven by their owner's input:
//! fire held sends them at the aim point, skill held repels them outward,
//! otherwise they hold a rotating orbit ring around the owner. Motion is a
//! spring toward the mode's desired point so transitions stay smooth.

use crate::sim::constants::{drones, movement};
use crate::sim::context::SimContext;
use crate::sim::entity::{DroneMode, EntityId};
use crate::util::vec2::Vec2;

struct OwnerInfo {
    id: EntityId,
    position: Vec2,
    cursor: Vec2,
    fire: bool,
    skill: bool,
}

pub fn update(ctx: &mut SimContext, dt: f32) {
    // Owner positions and intent, gathered before mutation
    let owners: Vec<OwnerInfo> = ctx
        .entities
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| {
            let input = ctx.inputs.get(&e.id);
            OwnerInfo {
                id: e.id,
                position: e.position,
                cursor: input.map(|i| i.cursor).unwrap_or(e.position),
                fire: input.map(|i| i.fire).unwrap_or(false),
                skill: input.map(|i| i.skill).unwrap_or(false),
            }
        })
        .collect();

    let mut orphaned: Vec<EntityId> = Vec::new();

    for e in ctx.entities.iter_mut() {
        let Some(mut drone) = e.drone else {
            continue;
        };
        let owner = e.owner.and_then(|id| owners.iter().find(|o| o.id == id));
        let Some(owner) = owner else {
            // Owner died or left; the drone expires
            orphaned.push(e.id);
            continue;
        };

        drone.mode = if owner.fire {
            DroneMode::Attack
        } else if owner.skill {
            DroneMode::Repel
        } else {
            DroneMode::Orbit
        };

        let desired = match drone.mode {
            DroneMode::Attack => owner.cursor,
            DroneMode::Repel => {
                let away = (e.position - owner.cursor).normalize();
                if away == Vec2::ZERO {
                    owner.position + Vec2::new(drones::REPEL_DISTANCE, 0.0)
                } else {
                    owner.position + away * drones::REPEL_DISTANCE
                }
            }
            DroneMode::Orbit | DroneMode::Idle => {
                drone.orbit_angle += drones::ORBIT_SPIN * dt;
                owner.position + Vec2::from_angle(drone.orbit_angle) * drones::ORBIT_RADIUS
            }
        };

        // Spring toward the desired point under the shared friction model
        let to_desired = desired - e.position;
        let accel = to_desired.clamp_length(drones::SPRING_ACCEL)
            * super::movement::status_speed_scale(e);
        e.velocity = e.velocity * movement::FRICTION + accel * (1.0 - movement::FRICTION);
        super::movement::shock_jitter(e);
        e.rotation = to_desired.angle();

        e.drone = Some(drone);
    }

    for id in orphaned {
        if let Some(index) = ctx.entities.index_of(id) {
            ctx.entities.release(index);
        }
    }
}
