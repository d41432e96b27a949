//! Weapon firing
//!
//! A volley starts when fire is held and the reload gate is open; barrels
//! with no stagger delay discharge on the same tick, the rest follow after
//! their own delay. What a barrel discharges depends on the archetype:
//! projectiles, a trap, a spray of short-lived waves, a drone summon, or an
//! instant cone scan for beams.

use rand::Rng;

use crate::catalog::{SkillKind, WeaponArchetype, WeaponSchema};
use crate::sim::constants::{skills as skill_consts, weapons};
use crate::sim::context::SimContext;
use crate::sim::entity::{
    DroneState, DroneVariant, Entity, EntityId, EntityKind, EntityTemplate, Team,
};
use crate::sim::events::AudioCue;
use crate::util::vec2::Vec2;

struct BarrelShot {
    shooter: EntityId,
    position: Vec2,
    aim: f32,
    level: u32,
    team: Team,
    turret: bool,
    barrel: usize,
}

pub fn update(ctx: &mut SimContext, dt: f32) {
    let catalog = ctx.catalog.clone();
    let mut shots: Vec<BarrelShot> = Vec::new();

    for e in ctx.entities.iter_mut() {
        let Some(weapon_id) = e.weapon else {
            continue;
        };
        if !e.is_alive() {
            continue;
        }
        let Some(schema) = catalog.get(weapon_id) else {
            continue;
        };

        if e.reload > 0.0 {
            e.reload -= dt;
        }

        // Pending barrel timers; a negative slot already discharged
        for b in 0..e.recoil.len() {
            if e.recoil[b] >= 0.0 {
                e.recoil[b] -= dt;
                if e.recoil[b] <= 0.0 {
                    shots.push(barrel_shot(e, schema, b));
                    e.recoil[b] = -1.0;
                }
            }
        }

        let firing = ctx.inputs.get(&e.id).map(|i| i.fire).unwrap_or(false);
        if firing && e.reload <= 0.0 {
            let mut reload = schema.reload;
            if e.has_active_skill(SkillKind::Overdrive) {
                reload *= skill_consts::OVERDRIVE_RELOAD_SCALE;
            }
            if e.has_active_skill(SkillKind::Turret) {
                reload *= skill_consts::TURRET_RELOAD_SCALE;
            }
            e.reload = reload;

            // Undelayed barrels discharge this tick; the rest arm their
            // stagger timers
            e.recoil.clear();
            for (b, barrel) in schema.barrels.iter().enumerate() {
                if barrel.delay > 0.0 {
                    e.recoil.push(barrel.delay);
                } else {
                    shots.push(barrel_shot(e, schema, b));
                    e.recoil.push(-1.0);
                }
            }
            if schema.barrels.is_empty() {
                shots.push(barrel_shot(e, schema, 0));
                e.recoil.push(-1.0);
            }

            // Knockback opposite the aim
            e.velocity -=
                Vec2::from_angle(e.rotation) * (weapons::RECOIL_IMPULSE * schema.recoil);
        }
    }

    for shot in shots {
        if let Some(schema) = catalog.get(match ctx.entities.get(shot.shooter) {
            Some(s) => match s.weapon {
                Some(w) => w,
                None => continue,
            },
            None => continue,
        }) {
            discharge(ctx, &shot, schema);
        }
    }
}

fn barrel_shot(e: &Entity, schema: &WeaponSchema, barrel: usize) -> BarrelShot {
    let muzzle = schema
        .barrels
        .get(barrel)
        .map(|bar| {
            e.position
                + Vec2::from_angle(e.rotation + bar.angle) * (e.radius + bar.length)
                + bar.offset
        })
        .unwrap_or(e.position);
    BarrelShot {
        shooter: e.id,
        position: muzzle,
        aim: e.rotation,
        level: e.level,
        team: e.team,
        turret: e.has_active_skill(SkillKind::Turret),
        barrel,
    }
}

/// Discharge one barrel according to the weapon archetype
fn discharge(ctx: &mut SimContext, shot: &BarrelShot, schema: &WeaponSchema) {
    let mut rng = rand::thread_rng();
    let mut damage = schema.damage;
    if shot.turret {
        damage *= skill_consts::TURRET_DAMAGE_SCALE;
    }
    let barrel_angle = schema.barrels.get(shot.barrel).map(|b| b.angle).unwrap_or(0.0);
    let aim = shot.aim + barrel_angle;
    let bullet_radius =
        schema.bullet_size + shot.level.saturating_sub(1) as f32 * weapons::BULLET_SIZE_PER_LEVEL;

    match schema.archetype {
        WeaponArchetype::Projectile => {
            for _ in 0..schema.bullet_count.max(1) {
                let spread = if schema.spread > 0.0 {
                    rng.gen_range(-schema.spread..=schema.spread)
                } else {
                    0.0
                };
                let dir = Vec2::from_angle(aim + spread);
                let lifetime =
                    (schema.range / schema.speed.max(1.0)).min(weapons::PROJECTILE_LIFETIME);
                ctx.entities.acquire(EntityTemplate {
                    kind: Some(EntityKind::Bullet),
                    position: shot.position,
                    velocity: dir * schema.speed,
                    rotation: aim + spread,
                    radius: Some(bullet_radius),
                    lifetime: Some(lifetime),
                    team: shot.team,
                    owner: Some(shot.shooter),
                    weapon: Some(schema.id),
                    damage,
                    ..Default::default()
                });
            }
            ctx.audio.push(AudioCue::Shot);
        }
        WeaponArchetype::Beam => {
            // Instant hit: one scan per activation, no entity spawned
            scan_cone(ctx, shot, schema, damage, aim);
            ctx.audio.push(AudioCue::Shot);
        }
        WeaponArchetype::Trap => {
            ctx.entities.acquire(EntityTemplate {
                kind: Some(EntityKind::Trap),
                position: shot.position + Vec2::from_angle(aim) * 30.0,
                velocity: Vec2::from_angle(aim) * (schema.speed * 0.25),
                rotation: aim,
                radius: Some(bullet_radius.max(8.0)),
                lifetime: Some(weapons::TRAP_LIFETIME),
                team: shot.team,
                owner: Some(shot.shooter),
                weapon: Some(schema.id),
                damage,
                ..Default::default()
            });
            ctx.audio.push(AudioCue::Shot);
        }
        WeaponArchetype::Cone => {
            // Waves are short-lived: their lifetime is capped so the spray
            // never outlives a fraction of a second regardless of range
            let lifetime =
                (schema.range / schema.speed.max(1.0)).min(weapons::WAVE_LIFETIME);
            for _ in 0..schema.bullet_count.max(1) {
                let angle = aim + rng.gen_range(-schema.cone_half_angle..=schema.cone_half_angle);
                let speed = schema.speed * rng.gen_range(0.7..=1.0);
                ctx.entities.acquire(EntityTemplate {
                    kind: Some(EntityKind::Wave),
                    position: shot.position,
                    velocity: Vec2::from_angle(angle) * speed,
                    rotation: angle,
                    radius: Some(bullet_radius),
                    lifetime: Some(lifetime),
                    team: shot.team,
                    owner: Some(shot.shooter),
                    weapon: Some(schema.id),
                    damage,
                    ..Default::default()
                });
            }
            ctx.audio.push(AudioCue::Shot);
        }
        WeaponArchetype::DroneSummon => {
            let owned = ctx
                .entities
                .iter()
                .filter(|e| e.kind.is_drone() && e.owner == Some(shot.shooter))
                .count() as u32;
            if owned < schema.max_drones {
                ctx.entities.acquire(EntityTemplate {
                    kind: Some(EntityKind::Drone(DroneVariant::Fighter)),
                    position: shot.position,
                    rotation: aim,
                    team: shot.team,
                    owner: Some(shot.shooter),
                    drone: Some(DroneState::default()),
                    ..Default::default()
                });
                ctx.audio.push(AudioCue::Shot);
            }
        }
    }
}

/// Sweep every hostile body inside the range and the forward angular
/// window, applying damage and the weapon's element directly. Walls do not
/// block the scan.
fn scan_cone(
    ctx: &mut SimContext,
    shot: &BarrelShot,
    schema: &WeaponSchema,
    damage: f32,
    aim: f32,
) {
    use std::f32::consts::{PI, TAU};

    let time = ctx.time;
    let mut dealt_total = 0.0;
    let mut reflected = 0.0;
    let mut reflector: Option<EntityId> = None;

    for e in ctx.entities.iter_mut() {
        if !e.kind.is_body() || !e.is_alive() || matches!(e.kind, EntityKind::Food(_)) {
            continue;
        }
        if e.id == shot.shooter {
            continue;
        }
        if e.team != 0 && e.team == shot.team && shot.team != 0 {
            continue;
        }
        let to_target = e.position - shot.position;
        let dist = to_target.length();
        if dist > schema.range + e.radius {
            continue;
        }
        // Widen the window by the target's angular size so a grazing edge
        // still counts
        let window = schema.cone_half_angle + (e.radius / dist.max(1.0)).atan();
        let off = (to_target.angle() - aim + PI).rem_euclid(TAU) - PI;
        if off.abs() > window {
            continue;
        }
        let dealt = super::collision::apply_damage(e, damage, Some(shot.shooter));
        if dealt > 0.0 {
            e.last_combat = time;
            if let Some(element) = schema.element {
                e.apply_effect(super::collision::element_effect(element, damage));
            }
            if e.has_active_skill(SkillKind::Reflect) {
                reflected += damage * skill_consts::REFLECT_FRACTION;
                reflector = Some(e.id);
            }
            dealt_total += dealt;
        }
    }

    if dealt_total > 0.0 {
        if let Some(shooter) = ctx.entities.get_mut(shot.shooter) {
            if shooter.is_alive() {
                shooter.last_combat = time;
                if shooter.has_active_skill(SkillKind::Lifesteal) {
                    shooter.health = (shooter.health
                        + dealt_total * skill_consts::LIFESTEAL_FRACTION)
                        .min(shooter.max_health);
                }
                if reflected > 0.0 {
                    super::collision::apply_damage(shooter, reflected, reflector);
                }
            }
        }
        ctx.audio.push(AudioCue::Hit);
    }
}

/// Area detonation: damage every hostile body in the blast radius, fan out
/// shrapnel unless this payload was itself shrapnel, and shake the camera.
pub fn detonate(
    ctx: &mut SimContext,
    position: Vec2,
    owner: Option<EntityId>,
    team: Team,
    schema: &WeaponSchema,
    from_shrapnel: bool,
) {
    let radius = weapons::EXPLOSION_RADIUS;

    for e in ctx.entities.iter_mut() {
        if !e.kind.is_body() || !e.is_alive() {
            continue;
        }
        if Some(e.id) == owner {
            continue;
        }
        if e.team != 0 && e.team == team && team != 0 {
            continue;
        }
        let dist = e.position.distance_to(position);
        if dist > radius + e.radius {
            continue;
        }
        // Linear falloff from the center
        let falloff = 1.0 - (dist / (radius + e.radius)).min(1.0);
        let amount = schema.damage * (0.5 + 0.5 * falloff);
        super::collision::apply_damage(e, amount, owner);
        // Knock away from the blast
        let push = (e.position - position).normalize() * (200.0 * falloff);
        e.velocity += push;
    }

    // Shrapnel fan, capped and never recursive
    if !from_shrapnel {
        let count = (schema.bullet_count.max(1) as usize * 2).min(weapons::SHRAPNEL_MAX);
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            ctx.entities.acquire(EntityTemplate {
                kind: Some(EntityKind::Bullet),
                position,
                velocity: Vec2::from_angle(angle) * (schema.speed * weapons::SHRAPNEL_SPEED_SCALE),
                rotation: angle,
                radius: Some(schema.bullet_size * 0.8),
                lifetime: Some(0.6),
                team,
                owner,
                weapon: Some(schema.id),
                damage: schema.damage * weapons::SHRAPNEL_DAMAGE_SCALE,
                shrapnel: true,
                ..Default::default()
            });
        }
    }

    ctx.spawn_burst(position, 18, 0.08);
    ctx.camera.add_shake(6.0);
    ctx.audio.push(AudioCue::Explosion);
}
