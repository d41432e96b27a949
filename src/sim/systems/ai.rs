//! Enemy steering
//!
//! AI entities synthesize an `InputFrame` just like a human client, so the
//! weapon system treats both identically. Steering is seek-plus-separation:
//! accelerate toward the target, push away from nearby allies.

use crate::catalog::SkillKind;
use crate::net::protocol::InputFrame;
use crate::sim::constants::{ai, movement};
use crate::sim::context::SimContext;
use crate::sim::entity::{AiMode, EntityId, EntityKind};
use crate::util::vec2::{lerp_angle, Vec2};

struct TargetInfo {
    id: EntityId,
    position: Vec2,
    stealthed: bool,
}

pub fn update(ctx: &mut SimContext, _dt: f32) {
    // Candidate targets, read before any mutation
    let targets: Vec<TargetInfo> = ctx
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Player && e.is_alive())
        .map(|e| TargetInfo {
            id: e.id,
            position: e.position,
            stealthed: e.has_active_skill(SkillKind::Stealth),
        })
        .collect();

    // Ally positions for the separation force
    let allies: Vec<(EntityId, Vec2)> = ctx
        .entities
        .iter()
        .filter(|e| e.ai.is_some() && e.is_alive())
        .map(|e| (e.id, e.position))
        .collect();

    let catalog = ctx.catalog.clone();

    for e in ctx.entities.iter_mut() {
        let Some(mut ai_state) = e.ai else {
            continue;
        };
        if !e.is_alive() {
            continue;
        }

        // Revalidate the remembered target, then fall back to the nearest
        let current = ai_state
            .target
            .and_then(|id| targets.iter().find(|t| t.id == id));
        let target = match current {
            Some(t) if in_acquire_range(&ai_state, e.position, t) => Some(t),
            _ => targets
                .iter()
                .filter(|t| in_acquire_range(&ai_state, e.position, t))
                .min_by(|a, b| {
                    let da = e.position.distance_sq_to(a.position);
                    let db = e.position.distance_sq_to(b.position);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                }),
        };

        let mut separation = Vec2::ZERO;
        for (ally_id, ally_pos) in &allies {
            if *ally_id == e.id {
                continue;
            }
            let away = e.position - *ally_pos;
            let dist = away.length();
            if dist > 0.0 && dist < ai::SEPARATION_RADIUS {
                separation += away.normalize() * (1.0 - dist / ai::SEPARATION_RADIUS);
            }
        }

        match target {
            Some(t) => {
                ai_state.mode = AiMode::Seek;
                ai_state.target = Some(t.id);

                let to_target = t.position - e.position;
                let seek = to_target.normalize() * ai::SEEK_ACCEL;
                let accel = (seek + separation * ai::SEPARATION_FORCE)
                    * super::movement::status_speed_scale(e);
                e.velocity =
                    e.velocity * movement::FRICTION + accel * (1.0 - movement::FRICTION);
                super::movement::shock_jitter(e);

                let aim = to_target.angle();
                e.rotation = lerp_angle(e.rotation, aim, ai::FACE_LERP);

                // Fire when inside the weapon's effective range
                let fire = e
                    .weapon
                    .and_then(|id| catalog.get(id))
                    .map(|w| to_target.length() <= w.range * ai::FIRE_RANGE_SCALE)
                    .unwrap_or(false);

                ctx.inputs.insert(
                    e.id,
                    InputFrame {
                        cursor: t.position,
                        aim,
                        fire,
                        ..Default::default()
                    },
                );
            }
            None => {
                ai_state.mode = AiMode::Idle;
                ai_state.target = None;
                // Idle drift: friction only, plus separation
                let accel = separation * ai::SEPARATION_FORCE
                    * super::movement::status_speed_scale(e);
                e.velocity =
                    e.velocity * movement::FRICTION + accel * (1.0 - movement::FRICTION);
                ctx.inputs.remove(&e.id);
            }
        }

        e.ai = Some(ai_state);
    }
}

fn in_acquire_range(state: &crate::sim::entity::AiState, from: Vec2, target: &TargetInfo) -> bool {
    let mut radius = state.acquire_radius;
    if target.stealthed {
        radius *= ai::STEALTH_ACQUIRE_SCALE;
    }
    from.distance_sq_to(target.position) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::constants::tick::DT;
    use crate::sim::entity::{AiState, SkillState, StatusEffect, StatusKind};
    use crate::catalog::SkillSpec;

    fn ctx_with_pair(distance: f32) -> (SimContext, EntityId, EntityId) {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("prey", Vec2::ZERO, 1).unwrap();
        let enemy = ctx
            .spawn_enemy(Vec2::new(distance, 0.0), 1)
            .expect("spawn under cap");
        (ctx, player, enemy)
    }

    #[test]
    fn test_enemy_seeks_player_in_range() {
        let (mut ctx, _player, enemy) = ctx_with_pair(300.0);

        for _ in 0..30 {
            update(&mut ctx, DT);
        }

        let e = ctx.entities.get(enemy).unwrap();
        assert_eq!(e.ai.unwrap().mode, AiMode::Seek);
        assert!(e.velocity.x < 0.0, "should accelerate toward the player");
    }

    #[test]
    fn test_enemy_idles_out_of_range() {
        let (mut ctx, _player, enemy) = ctx_with_pair(ai::ACQUIRE_RADIUS + 500.0);

        update(&mut ctx, DT);

        let e = ctx.entities.get(enemy).unwrap();
        assert_eq!(e.ai.unwrap().mode, AiMode::Idle);
        assert!(e.ai.unwrap().target.is_none());
    }

    #[test]
    fn test_stealth_shrinks_acquisition() {
        // In range normally, out of range once stealth scales the radius
        let distance = ai::ACQUIRE_RADIUS * 0.8;
        let (mut ctx, player, enemy) = ctx_with_pair(distance);
        {
            let p = ctx.entities.get_mut(player).unwrap();
            let mut skill = SkillState::from_spec(&SkillSpec {
                kind: SkillKind::Stealth,
                cooldown: 8.0,
                duration: 4.0,
            });
            skill.active = true;
            skill.duration_left = 4.0;
            p.skill = Some(skill);
        }

        update(&mut ctx, DT);

        let e = ctx.entities.get(enemy).unwrap();
        assert_eq!(e.ai.unwrap().mode, AiMode::Idle);
    }

    #[test]
    fn test_separation_pushes_clustered_enemies_apart() {
        let mut ctx = SimContext::new_offline();
        ctx.spawn_player("prey", Vec2::new(0.0, 1000.0), 1).unwrap();
        let a = ctx.spawn_enemy(Vec2::new(-10.0, 0.0), 1).unwrap();
        let b = ctx.spawn_enemy(Vec2::new(10.0, 0.0), 1).unwrap();

        for _ in 0..30 {
            update(&mut ctx, DT);
        }

        assert!(ctx.entities.get(a).unwrap().velocity.x < 0.0);
        assert!(ctx.entities.get(b).unwrap().velocity.x > 0.0);
    }

    #[test]
    fn test_ai_synthesizes_fire_input_in_weapon_range() {
        let (mut ctx, _player, enemy) = ctx_with_pair(150.0);
        // Enemies spawn with a weapon; 150 units is well inside blaster range
        assert!(ctx.entities.get(enemy).unwrap().weapon.is_some());

        update(&mut ctx, DT);

        let frame = ctx.inputs.get(&enemy).expect("AI should emit input");
        assert!(frame.fire);
    }

    #[test]
    fn test_frozen_enemy_accelerates_slower() {
        let (mut ctx_a, _p, normal) = ctx_with_pair(300.0);
        let (mut ctx_b, _p2, frozen) = ctx_with_pair(300.0);
        ctx_b
            .entities
            .get_mut(frozen)
            .unwrap()
            .apply_effect(StatusEffect::new(StatusKind::Freeze, 1000.0, 0.0));

        for _ in 0..60 {
            update(&mut ctx_a, DT);
            update(&mut ctx_b, DT);
        }

        let vn = ctx_a.entities.get(normal).unwrap().velocity.length();
        let vf = ctx_b.entities.get(frozen).unwrap().velocity.length();
        assert!(vf < vn * 0.6, "frozen {} vs normal {}", vf, vn);
    }

    #[test]
    fn test_dead_ai_does_not_steer() {
        let (mut ctx, _player, enemy) = ctx_with_pair(200.0);
        ctx.entities.get_mut(enemy).unwrap().health = 0.0;

        update(&mut ctx, DT);

        assert_eq!(ctx.entities.get(enemy).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_ai_mode_is_copy_ai_state() {
        let state = AiState::default();
        assert_eq!(state.mode, AiMode::Idle);
        assert_eq!(state.acquire_radius, ai::ACQUIRE_RADIUS);
    }
}
