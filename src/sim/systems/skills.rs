//! Skill activation and upkeep
//!
//! Every skill is a cooldown gate plus an optional duration window. The
//! flag-like skills (shield, armor, stealth, overdrive, turret, lifesteal,
//! reflect) only flip `active`; other systems consult the flag. One-shot
//! skills (zero duration) execute here on activation, and the area skills
//! (gravity, interval beam) run their upkeep here every tick.

use crate::catalog::SkillKind;
use crate::sim::constants::skills as consts;
use crate::sim::context::SimContext;
use crate::sim::entity::{EntityId, EntityKind, EntityTemplate, StatusEffect, StatusKind, Team};
use crate::sim::events::AudioCue;
use crate::util::vec2::Vec2;

struct SkillAction {
    caster: EntityId,
    kind: SkillKind,
    position: Vec2,
    rotation: f32,
    team: Team,
    weapon_damage: f32,
}

pub fn update(ctx: &mut SimContext, dt: f32) {
    let catalog = ctx.catalog.clone();
    let local = ctx.local_player;
    let mut actions: Vec<SkillAction> = Vec::new();
    let mut ready_cues = 0u32;

    for e in ctx.entities.iter_mut() {
        let Some(mut skill) = e.skill else {
            continue;
        };
        if !e.is_alive() {
            continue;
        }

        if skill.cooldown_left > 0.0 {
            skill.cooldown_left -= dt;
            if skill.cooldown_left <= 0.0 && Some(e.id) == local {
                ready_cues += 1;
            }
        }
        if skill.active {
            skill.duration_left -= dt;
            if skill.duration_left <= 0.0 {
                skill.active = false;
            }
        }

        let wants = ctx.inputs.get(&e.id).map(|i| i.skill).unwrap_or(false);
        if wants && skill.ready() && !skill.active {
            skill.cooldown_left = skill.cooldown;
            if skill.duration > 0.0 {
                skill.active = true;
                skill.duration_left = skill.duration;
            }
            let weapon_damage = e
                .weapon
                .and_then(|id| catalog.get(id))
                .map(|w| w.damage)
                .unwrap_or(consts::CHAIN_DAMAGE);
            actions.push(SkillAction {
                caster: e.id,
                kind: skill.kind,
                position: e.position,
                rotation: e.rotation,
                team: e.team,
                weapon_damage,
            });
        }

        // Sustained upkeep with a per-skill interval
        if skill.active {
            match skill.kind {
                SkillKind::IntervalBeam => {
                    skill.interval_timer -= dt;
                    if skill.interval_timer <= 0.0 {
                        skill.interval_timer = consts::INTERVAL_BEAM_PERIOD;
                        actions.push(SkillAction {
                            caster: e.id,
                            kind: SkillKind::IntervalBeam,
                            position: e.position,
                            rotation: e.rotation,
                            team: e.team,
                            weapon_damage: e
                                .weapon
                                .and_then(|id| catalog.get(id))
                                .map(|w| w.damage)
                                .unwrap_or(consts::CHAIN_DAMAGE),
                        });
                    }
                }
                SkillKind::Gravity => {
                    actions.push(SkillAction {
                        caster: e.id,
                        kind: SkillKind::Gravity,
                        position: e.position,
                        rotation: e.rotation,
                        team: e.team,
                        weapon_damage: 0.0,
                    });
                }
                _ => {}
            }
        }

        e.skill = Some(skill);
    }

    for _ in 0..ready_cues {
        ctx.audio.push(AudioCue::SkillReady);
    }

    for action in actions {
        execute(ctx, &action, dt);
    }
}

fn execute(ctx: &mut SimContext, action: &SkillAction, dt: f32) {
    match action.kind {
        SkillKind::Dash => {
            if let Some(e) = ctx.entities.get_mut(action.caster) {
                e.velocity += Vec2::from_angle(action.rotation) * consts::DASH_IMPULSE;
            }
        }
        SkillKind::Teleport => {
            if let Some(e) = ctx.entities.get_mut(action.caster) {
                e.position += Vec2::from_angle(action.rotation) * consts::TELEPORT_RANGE;
            }
            ctx.spawn_burst(action.position, 10, 0.55);
        }
        SkillKind::Emp => {
            for e in ctx.entities.iter_mut() {
                if !e.kind.is_body() || e.id == action.caster || !e.is_alive() {
                    continue;
                }
                if e.team == action.team && e.team != 0 {
                    continue;
                }
                if e.position.distance_to(action.position) <= consts::EMP_RADIUS {
                    e.velocity = Vec2::ZERO;
                    e.apply_effect(StatusEffect::new(StatusKind::Shock, 2.0, 0.0));
                }
            }
            ctx.spawn_burst(action.position, 24, 0.15);
            ctx.audio.push(AudioCue::Explosion);
        }
        SkillKind::ChainLightning => {
            chain_lightning(ctx, action);
        }
        SkillKind::BurstReload => {
            if let Some(e) = ctx.entities.get_mut(action.caster) {
                e.reload = 0.0;
            }
        }
        SkillKind::IntervalBeam => {
            ctx.entities.acquire(EntityTemplate {
                kind: Some(EntityKind::Laser),
                position: action.position,
                velocity: Vec2::from_angle(action.rotation) * 1200.0,
                rotation: action.rotation,
                radius: Some(4.0),
                lifetime: Some(0.4),
                team: action.team,
                owner: Some(action.caster),
                damage: action.weapon_damage * 0.6,
                ..Default::default()
            });
            ctx.audio.push(AudioCue::Shot);
        }
        SkillKind::Gravity => {
            for e in ctx.entities.iter_mut() {
                if !e.kind.is_body() || e.id == action.caster || !e.is_alive() {
                    continue;
                }
                if e.team == action.team && e.team != 0 {
                    continue;
                }
                let to_center = action.position - e.position;
                let dist = to_center.length();
                if dist > 0.0 && dist <= consts::GRAVITY_RADIUS {
                    e.velocity += to_center.normalize() * (consts::GRAVITY_PULL * dt);
                }
            }
        }
        // Flag skills: other systems consult `active`
        SkillKind::Shield
        | SkillKind::Armor
        | SkillKind::Reflect
        | SkillKind::Lifesteal
        | SkillKind::Stealth
        | SkillKind::Overdrive
        | SkillKind::Turret => {}
    }
}

/// Hop through up to `CHAIN_TARGETS` hostiles, each hop searching from the
/// last struck position
fn chain_lightning(ctx: &mut SimContext, action: &SkillAction) {
    let mut struck: Vec<EntityId> = Vec::new();
    let mut from = action.position;

    for _ in 0..consts::CHAIN_TARGETS {
        let next = ctx
            .entities
            .iter()
            .filter(|e| {
                e.kind.is_body()
                    && e.is_alive()
                    && e.id != action.caster
                    && !(e.team == action.team && e.team != 0)
                    && !struck.contains(&e.id)
                    && e.position.distance_to(from) <= consts::CHAIN_RADIUS
            })
            .min_by(|a, b| {
                let da = a.position.distance_sq_to(from);
                let db = b.position.distance_sq_to(from);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|e| (e.id, e.position));

        let Some((id, position)) = next else {
            break;
        };
        if let Some(e) = ctx.entities.get_mut(id) {
            super::collision::apply_damage(e, consts::CHAIN_DAMAGE, Some(action.caster));
            e.apply_effect(StatusEffect::new(StatusKind::Shock, 1.0, 0.0));
        }
        ctx.spawn_burst(position, 4, 0.15);
        struck.push(id);
        from = position;
    }

    if !struck.is_empty() {
        ctx.audio.push(AudioCue::Hit);
    }
}

/// Incoming damage multiplier from defensive skill flags
pub fn damage_taken_scale(e: &crate::sim::entity::Entity) -> f32 {
    if e.has_active_skill(SkillKind::Shield) {
        consts::SHIELD_DAMAGE_SCALE
    } else if e.has_active_skill(SkillKind::Armor) {
        consts::ARMOR_DAMAGE_SCALE
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SkillSpec;
    use crate::net::protocol::InputFrame;
    use crate::sim::constants::tick::DT;
    use crate::sim::entity::SkillState;

    fn ctx_with_skill(kind: SkillKind, cooldown: f32, duration: f32) -> (SimContext, EntityId) {
        let mut ctx = SimContext::new_offline();
        let id = ctx.spawn_player("caster", Vec2::ZERO, 1).unwrap();
        ctx.entities.get_mut(id).unwrap().skill = Some(SkillState::from_spec(&SkillSpec {
            kind,
            cooldown,
            duration,
        }));
        ctx.inputs.insert(
            id,
            InputFrame {
                skill: true,
                ..Default::default()
            },
        );
        (ctx, id)
    }

    #[test]
    fn test_activation_starts_cooldown_and_duration() {
        let (mut ctx, id) = ctx_with_skill(SkillKind::Shield, 8.0, 3.0);

        update(&mut ctx, DT);

        let skill = ctx.entities.get(id).unwrap().skill.unwrap();
        assert!(skill.active);
        assert!(skill.cooldown_left > 0.0);
        assert!(skill.duration_left > 0.0);
    }

    #[test]
    fn test_cooldown_blocks_reactivation() {
        let (mut ctx, id) = ctx_with_skill(SkillKind::Dash, 5.0, 0.0);

        update(&mut ctx, DT);
        let v1 = ctx.entities.get(id).unwrap().velocity.length();
        update(&mut ctx, DT);
        let v2 = ctx.entities.get(id).unwrap().velocity.length();

        assert!(v1 > 0.0, "dash should apply an impulse");
        assert!(v2 <= v1, "no second impulse while on cooldown");
    }

    #[test]
    fn test_duration_expires() {
        let (mut ctx, id) = ctx_with_skill(SkillKind::Stealth, 10.0, 0.2);

        update(&mut ctx, DT);
        assert!(ctx.entities.get(id).unwrap().skill.unwrap().active);

        for _ in 0..30 {
            update(&mut ctx, DT);
        }
        assert!(!ctx.entities.get(id).unwrap().skill.unwrap().active);
    }

    #[test]
    fn test_teleport_moves_along_aim() {
        let (mut ctx, id) = ctx_with_skill(SkillKind::Teleport, 6.0, 0.0);
        ctx.entities.get_mut(id).unwrap().rotation = 0.0;

        update(&mut ctx, DT);

        let p = ctx.entities.get(id).unwrap().position;
        assert!((p.x - consts::TELEPORT_RANGE).abs() < 1e-3);
    }

    #[test]
    fn test_emp_zeroes_hostile_velocity_and_shocks() {
        let (mut ctx, _id) = ctx_with_skill(SkillKind::Emp, 10.0, 0.0);
        let victim = ctx.spawn_player("victim", Vec2::new(100.0, 0.0), 2).unwrap();
        ctx.entities.get_mut(victim).unwrap().velocity = Vec2::new(50.0, 0.0);

        update(&mut ctx, DT);

        let v = ctx.entities.get(victim).unwrap();
        assert_eq!(v.velocity, Vec2::ZERO);
        assert!(v.effects.iter().any(|s| s.kind == StatusKind::Shock));
    }

    #[test]
    fn test_chain_lightning_hops_are_bounded() {
        let (mut ctx, _id) = ctx_with_skill(SkillKind::ChainLightning, 10.0, 0.0);
        let mut victims = Vec::new();
        for i in 0..8 {
            let v = ctx
                .spawn_player("v", Vec2::new(60.0 * (i + 1) as f32, 0.0), 2)
                .unwrap();
            victims.push(v);
        }

        update(&mut ctx, DT);

        let hit = victims
            .iter()
            .filter(|&&id| {
                let e = ctx.entities.get(id).unwrap();
                e.health < e.max_health
            })
            .count();
        assert!(hit > 0);
        assert!(hit <= consts::CHAIN_TARGETS);
    }

    #[test]
    fn test_gravity_pulls_hostiles_inward() {
        let (mut ctx, _id) = ctx_with_skill(SkillKind::Gravity, 10.0, 4.0);
        let victim = ctx.spawn_player("victim", Vec2::new(150.0, 0.0), 2).unwrap();

        for _ in 0..10 {
            update(&mut ctx, DT);
        }

        assert!(ctx.entities.get(victim).unwrap().velocity.x < 0.0);
    }

    #[test]
    fn test_interval_beam_fires_periodically() {
        let (mut ctx, _id) = ctx_with_skill(SkillKind::IntervalBeam, 20.0, 5.0);

        let ticks = (consts::INTERVAL_BEAM_PERIOD / DT) as usize * 2 + 4;
        for _ in 0..ticks {
            update(&mut ctx, DT);
        }

        let lasers = ctx
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Laser)
            .count();
        assert!(lasers >= 2, "expected repeated beams, got {}", lasers);
    }

    #[test]
    fn test_shield_scales_incoming_damage() {
        let (mut ctx, id) = ctx_with_skill(SkillKind::Shield, 8.0, 3.0);
        update(&mut ctx, DT);

        let e = ctx.entities.get(id).unwrap();
        assert_eq!(damage_taken_scale(e), consts::SHIELD_DAMAGE_SCALE);
    }
}
