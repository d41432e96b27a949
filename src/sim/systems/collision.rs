//! Collision resolution and damage
//!
//! Two regimes per tick, broad-phased by the spatial hash:
//! - fast projectiles sweep from their old to new position (slab test vs
//!   rectangles, quadratic vs circles) and stop at the smallest time of
//!   impact, so no bullet tunnels through a thin wall in one tick
//! - bodies move discretely, get pushed out of walls, and resolve mutual
//!   overlap with a soft positional correction plus contact damage
//!
//! Damage, status effects, deaths, XP, and loot all resolve here, after
//! every contact for the tick is known.

use crate::catalog::{Element, SkillKind};
use crate::sim::constants::{entity as entity_consts, level, status};
use crate::sim::constants::skills as skill_consts;
use crate::sim::context::SimContext;
use crate::sim::entity::{
    Entity, EntityId, EntityKind, FoodTier, StatusEffect, StatusKind, Team,
};
use crate::sim::events::{AudioCue, KillFeedEntry};
use crate::sim::spatial::Aabb;
use crate::util::vec2::Vec2;

/// Earliest time of impact in [0, 1] for a circle swept against a circle.
/// Already-overlapping starts report 0.
pub fn sweep_circle_circle(
    from: Vec2,
    to: Vec2,
    radius: f32,
    center: Vec2,
    target_radius: f32,
) -> Option<f32> {
    let d = to - from;
    let f = from - center;
    let r = radius + target_radius;

    if f.length_sq() <= r * r {
        return Some(0.0);
    }

    let a = d.length_sq();
    if a <= f32::EPSILON {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let c = f.length_sq() - r * r;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    if (0.0..=1.0).contains(&t) {
        Some(t)
    } else {
        None
    }
}

/// Earliest time of impact in [0, 1] for a circle swept against a rect.
/// Slab test against the rectangle expanded by the circle radius.
pub fn sweep_circle_rect(
    from: Vec2,
    to: Vec2,
    radius: f32,
    rect_min: Vec2,
    rect_max: Vec2,
) -> Option<f32> {
    let min = rect_min - Vec2::new(radius, radius);
    let max = rect_max + Vec2::new(radius, radius);
    let d = to - from;

    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;

    for axis in 0..2 {
        let (origin, delta, lo, hi) = if axis == 0 {
            (from.x, d.x, min.x, max.x)
        } else {
            (from.y, d.y, min.y, max.y)
        };
        if delta.abs() <= f32::EPSILON {
            if origin < lo || origin > hi {
                return None;
            }
        } else {
            let inv = 1.0 / delta;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_enter = t_enter.max(t1);
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }
    }

    Some(t_enter.max(0.0))
}

/// Whether damage flows between two teams. Team 0 is hostile to everyone.
fn hostile(a: Team, b: Team) -> bool {
    a == 0 || b == 0 || a != b
}

/// Subtract damage, honoring invulnerability and defensive skill flags.
/// Returns the amount actually dealt.
pub(crate) fn apply_damage(e: &mut Entity, amount: f32, attacker: Option<EntityId>) -> f32 {
    if e.god || !e.is_alive() || amount <= 0.0 {
        return 0.0;
    }
    let dealt = amount * super::skills::damage_taken_scale(e);
    e.health -= dealt;
    if attacker.is_some() {
        e.last_hit_by = attacker;
    }
    dealt
}

pub(crate) fn element_effect(element: Element, damage: f32) -> StatusEffect {
    match element {
        Element::Burn => StatusEffect::new(StatusKind::Burn, 3.0, damage * 0.2),
        Element::Freeze => StatusEffect::new(StatusKind::Freeze, 2.0, 0.0),
        Element::Shock => StatusEffect::new(StatusKind::Shock, 1.5, 0.0),
        Element::Corrosion => StatusEffect::new(StatusKind::Corrosion, 4.0, damage * 0.15),
    }
}

struct Impact {
    projectile: EntityId,
    /// Live position at the time of impact
    point: Vec2,
    /// None for a wall hit
    target: Option<EntityId>,
}

pub fn update(ctx: &mut SimContext, dt: f32) {
    integrate_bodies(ctx, dt);
    rebuild_grid(ctx);
    resolve_projectiles(ctx, dt);
    resolve_walls(ctx);
    resolve_bodies(ctx, dt);
    tick_status(ctx, dt);
    resolve_deaths(ctx);
}

/// Discrete integration for everything that is not a swept projectile
fn integrate_bodies(ctx: &mut SimContext, dt: f32) {
    let half = ctx.arena_half;
    for e in ctx.entities.iter_mut() {
        if e.kind.is_swept_projectile() || e.kind.is_static() {
            continue;
        }
        e.position += e.velocity * dt;
        if e.kind.is_body() {
            e.position.x = e.position.x.clamp(-half.x, half.x);
            e.position.y = e.position.y.clamp(-half.y, half.y);
        }
    }
}

/// Rebuild the broad phase from the post-integration positions
fn rebuild_grid(ctx: &mut SimContext) {
    ctx.grid.clear();
    for (i, e) in ctx.entities.iter().enumerate() {
        let aabb = match e.kind {
            EntityKind::Wall => match e.extent {
                Some(half) => Aabb::from_rect(e.position, half),
                None => continue,
            },
            k if k.is_body() => Aabb::from_circle(e.position, e.radius),
            _ => continue,
        };
        // The grid is rebuilt every tick so indices stay valid within it
        ctx.grid.insert(i as u32, aabb);
    }
}

fn resolve_projectiles(ctx: &mut SimContext, dt: f32) {
    let catalog = ctx.catalog.clone();
    let mut impacts: Vec<Impact> = Vec::new();
    let mut misses: Vec<(EntityId, Vec2)> = Vec::new();

    {
        let live = ctx.entities.live();
        for p in live.iter() {
            if !p.kind.is_swept_projectile() && p.kind != EntityKind::Wave {
                continue;
            }

            let (from, to) = if p.kind == EntityKind::Wave {
                // Discrete regime: already integrated, test in place
                (p.position, p.position)
            } else {
                (p.position, p.position + p.velocity * dt)
            };

            let mut best: Option<(f32, Option<EntityId>)> = None;
            for index in ctx.grid.query_swept(from, to, p.radius) {
                let Some(target) = live.get(index as usize) else {
                    continue;
                };
                if Some(target.id) == p.owner || target.id == p.id {
                    continue;
                }
                let t = match target.kind {
                    EntityKind::Wall => match target.extent {
                        Some(half) => sweep_circle_rect(
                            from,
                            to,
                            p.radius,
                            target.position - half,
                            target.position + half,
                        ),
                        None => None,
                    },
                    k if k.is_body() && !matches!(k, EntityKind::Food(_)) => {
                        if !target.is_alive() || !hostile(p.team, target.team) {
                            None
                        } else {
                            sweep_circle_circle(from, to, p.radius, target.position, target.radius)
                        }
                    }
                    _ => None,
                };
                let Some(t) = t else { continue };
                // Minimum time of impact wins
                if best.map(|(bt, _)| t < bt).unwrap_or(true) {
                    let hit_target = if target.kind == EntityKind::Wall {
                        None
                    } else {
                        Some(target.id)
                    };
                    best = Some((t, hit_target));
                }
            }

            match best {
                Some((t, target)) => impacts.push(Impact {
                    projectile: p.id,
                    point: from + (to - from) * t,
                    target,
                }),
                None => misses.push((p.id, to)),
            }
        }
    }

    for (id, to) in misses {
        if let Some(p) = ctx.entities.get_mut(id) {
            p.position = to;
        }
    }

    let time = ctx.time;
    for impact in impacts {
        let Some(p) = ctx.entities.get(impact.projectile) else {
            continue;
        };
        let owner = p.owner;
        let team = p.team;
        let damage = p.damage;
        let weapon = p.weapon;
        let shrapnel = p.shrapnel;
        let schema = weapon.and_then(|id| catalog.get(id));
        let element = schema.and_then(|s| s.element);

        if let Some(target_id) = impact.target {
            // Combat timestamps only move for hits from a living attacker;
            // a projectile can outlive its shooter
            let attacker_alive = owner
                .and_then(|id| ctx.entities.get(id))
                .map(|a| a.is_alive())
                .unwrap_or(false);
            let mut dealt = 0.0;
            let mut reflected = 0.0;
            if let Some(target) = ctx.entities.get_mut(target_id) {
                dealt = apply_damage(target, damage, owner);
                if dealt > 0.0 {
                    if attacker_alive {
                        target.last_combat = time;
                    }
                    if let Some(element) = element {
                        target.apply_effect(element_effect(element, damage));
                    }
                    if target.has_active_skill(SkillKind::Reflect) {
                        // A fraction of the incoming hit comes back
                        reflected = damage * skill_consts::REFLECT_FRACTION;
                    }
                }
            }
            if dealt > 0.0 {
                if let Some(shooter_id) = owner {
                    if let Some(shooter) = ctx.entities.get_mut(shooter_id) {
                        if shooter.is_alive() {
                            shooter.last_combat = time;
                            if shooter.has_active_skill(SkillKind::Lifesteal) {
                                shooter.health = (shooter.health
                                    + dealt * skill_consts::LIFESTEAL_FRACTION)
                                    .min(shooter.max_health);
                            }
                            if reflected > 0.0 {
                                apply_damage(shooter, reflected, Some(target_id));
                            }
                        }
                    }
                }
                ctx.audio.push(AudioCue::Hit);
            }
        }

        if let Some(schema) = schema {
            if schema.explosive && !shrapnel {
                super::weapons::detonate(ctx, impact.point, owner, team, schema, false);
            }
        }

        // The projectile stops at the impact point and retires
        if let Some(p) = ctx.entities.get_mut(impact.projectile) {
            p.position = impact.point;
            p.health = 0.0;
        }
    }

    // Lifetimes; explosive payloads detonate on expiry
    let mut expired: Vec<EntityId> = Vec::new();
    for e in ctx.entities.iter_mut() {
        if !e.kind.is_projectile() {
            continue;
        }
        if let Some(lifetime) = e.lifetime.as_mut() {
            *lifetime -= dt;
            if *lifetime <= 0.0 && e.is_alive() {
                expired.push(e.id);
            }
        }
    }
    for id in expired {
        let info = ctx.entities.get(id).map(|p| {
            (p.position, p.owner, p.team, p.weapon, p.shrapnel)
        });
        if let Some((position, owner, team, weapon, shrapnel)) = info {
            if let Some(schema) = weapon.and_then(|w| catalog.get(w)) {
                if schema.explosive && !shrapnel {
                    super::weapons::detonate(ctx, position, owner, team, schema, false);
                }
            }
            if let Some(p) = ctx.entities.get_mut(id) {
                p.health = 0.0;
            }
        }
    }
}

/// Push bodies out of wall rectangles along the smallest penetration axis
fn resolve_walls(ctx: &mut SimContext) {
    let walls: Vec<(Vec2, Vec2)> = ctx
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Wall)
        .filter_map(|e| e.extent.map(|half| (e.position, half)))
        .collect();
    if walls.is_empty() {
        return;
    }

    for e in ctx.entities.iter_mut() {
        if !e.kind.is_body() || !e.is_alive() {
            continue;
        }
        for (center, half) in &walls {
            let min = *center - *half;
            let max = *center + *half;
            let closest = Vec2::new(
                e.position.x.clamp(min.x, max.x),
                e.position.y.clamp(min.y, max.y),
            );
            let away = e.position - closest;
            let dist = away.length();
            if dist >= e.radius {
                continue;
            }
            if dist > 0.0 {
                let normal = away.normalize();
                e.position = closest + normal * e.radius;
                // Kill the velocity component into the wall
                let into = e.velocity.dot(-normal);
                if into > 0.0 {
                    e.velocity += normal * into;
                }
            } else {
                // Center inside the rect; eject along the shallow axis
                let left = e.position.x - min.x;
                let right = max.x - e.position.x;
                let top = e.position.y - min.y;
                let bottom = max.y - e.position.y;
                let shallow = left.min(right).min(top).min(bottom);
                if shallow == left {
                    e.position.x = min.x - e.radius;
                } else if shallow == right {
                    e.position.x = max.x + e.radius;
                } else if shallow == top {
                    e.position.y = min.y - e.radius;
                } else {
                    e.position.y = max.y + e.radius;
                }
            }
        }
    }
}

/// Soft body-body separation, contact damage, and food pickup
fn resolve_bodies(ctx: &mut SimContext, _dt: f32) {
    // Overlapping index pairs from the broad phase, each counted once
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    {
        let live = ctx.entities.live();
        for (i, e) in live.iter().enumerate() {
            if !e.kind.is_body() || !e.is_alive() {
                continue;
            }
            for j in ctx.grid.query(Aabb::from_circle(e.position, e.radius)) {
                let j = j as usize;
                if j <= i {
                    continue;
                }
                let Some(other) = live.get(j) else { continue };
                if !other.kind.is_body() || !other.is_alive() {
                    continue;
                }
                let reach = e.radius + other.radius;
                if e.position.distance_sq_to(other.position) < reach * reach {
                    pairs.push((i, j));
                }
            }
        }
    }

    let xp_mult = ctx.xp_multiplier();
    let time = ctx.time;
    let mut eaten: Vec<EntityId> = Vec::new();
    let mut level_ups = 0u32;

    for (i, j) in pairs {
        let live = ctx.entities.live_mut();
        if i >= live.len() || j >= live.len() {
            continue;
        }
        let (head, tail) = live.split_at_mut(j);
        let a = &mut head[i];
        let b = &mut tail[0];

        // Food pickup: players absorb food for XP
        let food = match (a.kind, b.kind) {
            (EntityKind::Player, EntityKind::Food(tier)) => Some((tier, false)),
            (EntityKind::Food(tier), EntityKind::Player) => Some((tier, true)),
            _ => None,
        };
        if let Some((tier, swapped)) = food {
            let (player, food_entity) = if swapped { (b, a) } else { (a, b) };
            level_ups += player.grant_xp(tier.xp() * xp_mult);
            eaten.push(food_entity.id);
            continue;
        }
        if matches!(a.kind, EntityKind::Food(_)) || matches!(b.kind, EntityKind::Food(_)) {
            continue;
        }

        // Soft positional correction, half the depth split between both
        let between = b.position - a.position;
        let dist = between.length();
        let depth = (a.radius + b.radius) - dist;
        if depth > 0.0 {
            let normal = if dist > 0.0 {
                between.normalize()
            } else {
                Vec2::new(1.0, 0.0)
            };
            let correction = normal * (depth * entity_consts::SEPARATION_FACTOR * 0.5);
            a.position -= correction;
            b.position += correction;
        }

        // Symmetric contact damage between hostile bodies
        if hostile(a.team, b.team) {
            let a_attacker = a.owner.unwrap_or(a.id);
            let b_attacker = b.owner.unwrap_or(b.id);
            if apply_damage(a, entity_consts::CONTACT_DAMAGE, Some(b_attacker)) > 0.0 {
                a.last_combat = time;
            }
            if apply_damage(b, entity_consts::CONTACT_DAMAGE, Some(a_attacker)) > 0.0 {
                b.last_combat = time;
            }
        }
    }

    for id in eaten {
        if let Some(index) = ctx.entities.index_of(id) {
            ctx.entities.release(index);
        }
    }
    for _ in 0..level_ups {
        ctx.audio.push(AudioCue::LevelUp);
    }
}

/// Tick timed status effects: periodic damage for burn/corrosion, expiry
fn tick_status(ctx: &mut SimContext, dt: f32) {
    for e in ctx.entities.iter_mut() {
        if e.effects.is_empty() {
            continue;
        }
        let mut dot = 0.0;
        for effect in e.effects.iter_mut() {
            effect.remaining -= dt;
            if matches!(effect.kind, StatusKind::Burn | StatusKind::Corrosion) {
                effect.cadence += dt;
                while effect.cadence >= status::DOT_INTERVAL {
                    effect.cadence -= status::DOT_INTERVAL;
                    dot += effect.magnitude;
                }
            }
        }
        e.effects.retain(|s| s.remaining > 0.0);
        if dot > 0.0 && !e.god {
            e.health -= dot;
        }
    }
}

struct Death {
    victim: EntityId,
    victim_name: String,
    victim_kind: EntityKind,
    position: Vec2,
    max_health: f32,
    killer: Option<EntityId>,
}

/// Resolve deaths: dummies self-heal, everything else pays out and retires
fn resolve_deaths(ctx: &mut SimContext) {
    let xp_mult = ctx.xp_multiplier();
    let score_mult = ctx.score_multiplier();
    let mut deaths: Vec<Death> = Vec::new();

    for e in ctx.entities.iter_mut() {
        if e.is_alive() {
            continue;
        }
        if e.kind == EntityKind::Dummy {
            // Practice targets never die
            e.health = e.max_health;
            continue;
        }
        if e.kind.is_body() {
            deaths.push(Death {
                victim: e.id,
                victim_name: e.name.clone(),
                victim_kind: e.kind,
                position: e.position,
                max_health: e.max_health,
                killer: e.last_hit_by,
            });
        }
    }

    let tick_now = ctx.tick;
    for death in &deaths {
        // Controllers stop with their entity
        ctx.inputs.remove(&death.victim);

        let mut killer_name = None;
        if let Some(killer_id) = death.killer {
            if let Some(killer) = ctx.entities.get_mut(killer_id) {
                // Payout only to a living player-kind killer
                if killer.kind == EntityKind::Player && killer.is_alive() {
                    let ups =
                        killer.grant_xp(death.max_health * level::XP_PER_MAX_HEALTH * xp_mult);
                    killer.score += level::SCORE_PER_KILL * score_mult;
                    killer.kill_streak += 1;
                    killer_name = Some(killer.name.clone());
                    for _ in 0..ups {
                        ctx.audio.push(AudioCue::LevelUp);
                    }
                }
            }
        }

        match death.victim_kind {
            EntityKind::Player => {
                ctx.spawn_food(death.position, FoodTier::Feast);
                ctx.camera.add_shake(8.0);
            }
            EntityKind::Enemy => {
                ctx.spawn_food(death.position, FoodTier::Chunk);
            }
            _ => {}
        }
        ctx.spawn_burst(death.position, 12, 0.0);
        ctx.audio.push(AudioCue::Kill);

        if matches!(death.victim_kind, EntityKind::Player | EntityKind::Enemy) {
            ctx.kill_feed.push(KillFeedEntry {
                killer: killer_name.unwrap_or_default(),
                victim: death.victim_name.clone(),
                tick: tick_now,
            });
        }
    }

    // Retire every dead entity, projectiles included
    ctx.entities
        .release_where(|e| !e.is_alive() && e.kind != EntityKind::Dummy && !e.kind.is_static());
}
