//! Snapshot capture, application, and client-side smoothing strategies
//!
//! The host captures the full world every few ticks; clients apply it over
//! their predicted state. The local player's entity is only hard-corrected
//! when prediction drifts beyond a squared-distance threshold, so small
//! divergence never causes visible rubber-banding. Other entities ease
//! toward authority with a fixed lerp.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::net::protocol::{EntitySnapshot, ParticleSnapshot, WorldSnapshot};
use crate::sim::constants::net as net_consts;
use crate::sim::context::SimContext;
use crate::sim::entity::{EntityId, EntityTemplate};
use crate::sim::pool::Particle;
use crate::util::vec2::lerp_angle;

/// Capture the authoritative world at the current tick
pub fn capture(ctx: &SimContext, timestamp_ms: u64) -> WorldSnapshot {
    WorldSnapshot {
        tick: ctx.tick,
        timestamp_ms,
        entities: ctx.entities.iter().map(EntitySnapshot::from_entity).collect(),
        particles: ctx
            .particles
            .iter()
            .take(256)
            .map(ParticleSnapshot::from_particle)
            .collect(),
    }
}

fn template_from(snap: &EntitySnapshot) -> EntityTemplate {
    EntityTemplate {
        kind: Some(snap.kind),
        position: snap.position,
        velocity: snap.velocity,
        rotation: snap.rotation,
        radius: Some(snap.radius),
        health: Some(snap.max_health),
        lifetime: snap.lifetime,
        team: snap.team,
        owner: snap.owner,
        weapon: snap.weapon,
        damage: snap.damage,
        extent: snap.extent,
        shrapnel: snap.shrapnel,
        name: Some(snap.name.clone()),
        ..Default::default()
    }
}

/// Apply an authoritative snapshot over local state.
///
/// `smooth` is the remote-entity lerp factor; `reconcile_dist_sq` is the
/// squared drift beyond which the local player's prediction is snapped.
pub fn apply_snapshot(
    ctx: &mut SimContext,
    snapshot: &WorldSnapshot,
    local: Option<EntityId>,
    smooth: f32,
    reconcile_dist_sq: f32,
) {
    let mut seen: FxHashSet<EntityId> = FxHashSet::default();

    for snap in &snapshot.entities {
        seen.insert(snap.id);

        if ctx.entities.get(snap.id).is_none() {
            // New to us: mirror it under the authoritative id
            if ctx.entities.acquire_with_id(snap.id, template_from(snap)).is_none() {
                continue;
            }
        }

        let Some(e) = ctx.entities.get_mut(snap.id) else {
            continue;
        };

        if Some(snap.id) == local {
            // Soft reconciliation: trust prediction inside the threshold
            if e.position.distance_sq_to(snap.position) > reconcile_dist_sq {
                e.position = snap.position;
                e.velocity = snap.velocity;
            }
        } else {
            e.position = e.position.lerp(snap.position, smooth);
            e.velocity = snap.velocity;
            e.rotation = lerp_angle(e.rotation, snap.rotation, smooth);
        }

        // Scalars are always authoritative. Kind included: a recycled id
        // may reappear as a different kind of entity.
        e.kind = snap.kind;
        e.radius = snap.radius;
        e.health = snap.health;
        e.max_health = snap.max_health;
        e.team = snap.team;
        e.owner = snap.owner;
        e.weapon = snap.weapon;
        e.damage = snap.damage;
        e.lifetime = snap.lifetime;
        e.level = snap.level;
        e.score = snap.score;
        e.shrapnel = snap.shrapnel;
        e.effects = snap.effects.clone();
        e.recoil = snap.recoil.clone();
        if e.name != snap.name {
            e.name = snap.name.clone();
        }
    }

    // Anything authority no longer knows is gone, except static geometry
    ctx.entities
        .release_where(|e| !seen.contains(&e.id) && !e.kind.is_static());

    ctx.particles.clear();
    for p in &snapshot.particles {
        ctx.particles.spawn(Particle {
            position: p.position,
            velocity: p.velocity,
            lifetime: p.lifetime,
            size: p.size,
            hue: p.hue,
        });
    }
}

/// How a client turns the stream of incoming snapshots into the one it
/// applies each frame
pub trait SnapshotStrategy {
    fn ingest(&mut self, snapshot: WorldSnapshot);
    /// The snapshot to apply now, if any. `now_ms` is the client clock.
    fn sample(&mut self, now_ms: u64) -> Option<WorldSnapshot>;
}

/// Apply the newest snapshot as soon as it arrives. Lowest latency,
/// stutters under loss.
#[derive(Default)]
pub struct LatestSnapshot {
    pending: Option<WorldSnapshot>,
}

impl SnapshotStrategy for LatestSnapshot {
    fn ingest(&mut self, snapshot: WorldSnapshot) {
        match &self.pending {
            Some(p) if p.tick >= snapshot.tick => {}
            _ => self.pending = Some(snapshot),
        }
    }

    fn sample(&mut self, _now_ms: u64) -> Option<WorldSnapshot> {
        self.pending.take()
    }
}

/// Buffer snapshots and render a fixed delay in the past, interpolating
/// between the two that bracket the render time. Smoother under jitter at
/// the cost of latency.
pub struct BufferedInterpolation {
    buffer: VecDeque<WorldSnapshot>,
    delay_ms: u64,
}

impl BufferedInterpolation {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            buffer: VecDeque::new(),
            delay_ms,
        }
    }
}

impl Default for BufferedInterpolation {
    fn default() -> Self {
        Self::new(net_consts::INTERP_DELAY_MS)
    }
}

impl SnapshotStrategy for BufferedInterpolation {
    fn ingest(&mut self, snapshot: WorldSnapshot) {
        // Keep the buffer ordered by timestamp; late arrivals are dropped
        if let Some(last) = self.buffer.back() {
            if snapshot.timestamp_ms <= last.timestamp_ms {
                return;
            }
        }
        self.buffer.push_back(snapshot);
        while self.buffer.len() > net_consts::SNAPSHOT_BUFFER {
            self.buffer.pop_front();
        }
    }

    fn sample(&mut self, now_ms: u64) -> Option<WorldSnapshot> {
        let render = now_ms.saturating_sub(self.delay_ms);

        // Drop snapshots that are older than the pair we need
        while self.buffer.len() > 2 && self.buffer[1].timestamp_ms <= render {
            self.buffer.pop_front();
        }

        match self.buffer.len() {
            0 => None,
            1 => Some(self.buffer[0].clone()),
            _ => {
                let older = &self.buffer[0];
                let newer = &self.buffer[1];
                if render <= older.timestamp_ms {
                    Some(older.clone())
                } else if render >= newer.timestamp_ms {
                    Some(newer.clone())
                } else {
                    let span = (newer.timestamp_ms - older.timestamp_ms) as f32;
                    let t = (render - older.timestamp_ms) as f32 / span;
                    Some(interpolate(older, newer, t))
                }
            }
        }
    }
}

/// Blend two snapshots; entities present in both are lerped, entities only
/// in the newer one are taken as-is
fn interpolate(older: &WorldSnapshot, newer: &WorldSnapshot, t: f32) -> WorldSnapshot {
    let mut out = newer.clone();
    for e in out.entities.iter_mut() {
        if let Some(prev) = older.entities.iter().find(|p| p.id == e.id) {
            e.position = prev.position.lerp(e.position, t);
            e.rotation = lerp_angle(prev.rotation, e.rotation, t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::constants::net::RECONCILE_DIST_SQ;
    use crate::sim::entity::EntityKind;
    use crate::util::vec2::Vec2;

    fn host_world() -> SimContext {
        let mut ctx = SimContext::new_offline();
        let p = ctx.spawn_player("host", Vec2::new(100.0, 50.0), 1).unwrap();
        ctx.local_player = Some(p);
        // Mid-volley barrel timer, part of the authoritative state
        ctx.entities.get_mut(p).unwrap().recoil.push(0.08);
        ctx.spawn_enemy(Vec2::new(-200.0, 0.0), 2).unwrap();
        ctx.spawn_wall(Vec2::new(0.0, 300.0), Vec2::new(50.0, 10.0));
        ctx
    }

    #[test]
    fn test_capture_apply_round_trip() {
        let host = host_world();
        let snapshot = capture(&host, 1000);

        let mut client = SimContext::new_offline();
        apply_snapshot(&mut client, &snapshot, None, 1.0, RECONCILE_DIST_SQ);

        assert_eq!(client.entities.len(), host.entities.len());
        for he in host.entities.iter() {
            let ce = client.entities.get(he.id).expect("entity mirrored");
            assert_eq!(ce.kind, he.kind);
            assert!(ce.position.approx_eq(he.position, 0.01));
            assert_eq!(ce.health, he.health);
            assert_eq!(ce.name, he.name);
            assert_eq!(ce.recoil, he.recoil);
        }
    }

    #[test]
    fn test_snapshot_overwrites_stale_kind_on_reused_id() {
        let host = host_world();
        let local = host.local_player.unwrap();
        let snapshot = capture(&host, 1000);

        // The client already holds this id as a different kind of entity
        let mut client = SimContext::new_offline();
        client
            .entities
            .acquire_with_id(
                local,
                EntityTemplate {
                    kind: Some(EntityKind::Bullet),
                    position: Vec2::new(100.0, 50.0),
                    ..Default::default()
                },
            )
            .unwrap();

        apply_snapshot(&mut client, &snapshot, None, 1.0, RECONCILE_DIST_SQ);

        assert_eq!(client.entities.get(local).unwrap().kind, EntityKind::Player);
    }

    #[test]
    fn test_small_drift_keeps_prediction() {
        let host = host_world();
        let local = host.local_player.unwrap();
        let snapshot = capture(&host, 1000);

        let mut client = SimContext::new_offline();
        apply_snapshot(&mut client, &snapshot, Some(local), 1.0, RECONCILE_DIST_SQ);

        // Drift well inside the threshold (200^2)
        let predicted = Vec2::new(105.0, 50.0);
        client.entities.get_mut(local).unwrap().position = predicted;

        apply_snapshot(&mut client, &snapshot, Some(local), 1.0, RECONCILE_DIST_SQ);
        assert!(client
            .entities
            .get(local)
            .unwrap()
            .position
            .approx_eq(predicted, 0.01));
    }

    #[test]
    fn test_large_drift_snaps_to_authority() {
        let host = host_world();
        let local = host.local_player.unwrap();
        let snapshot = capture(&host, 1000);

        let mut client = SimContext::new_offline();
        apply_snapshot(&mut client, &snapshot, Some(local), 1.0, RECONCILE_DIST_SQ);

        client.entities.get_mut(local).unwrap().position = Vec2::new(3000.0, 50.0);

        apply_snapshot(&mut client, &snapshot, Some(local), 1.0, RECONCILE_DIST_SQ);
        assert!(client
            .entities
            .get(local)
            .unwrap()
            .position
            .approx_eq(Vec2::new(100.0, 50.0), 0.01));
    }

    #[test]
    fn test_absent_entities_removed_except_static() {
        let host = host_world();
        let snapshot = capture(&host, 1000);

        let mut client = SimContext::new_offline();
        apply_snapshot(&mut client, &snapshot, None, 1.0, RECONCILE_DIST_SQ);

        // Client-only clutter plus client-only wall
        let stale = client.spawn_enemy(Vec2::new(900.0, 900.0), 3).unwrap();
        let wall = client.spawn_wall(Vec2::new(900.0, -900.0), Vec2::new(5.0, 5.0)).unwrap();

        apply_snapshot(&mut client, &snapshot, None, 1.0, RECONCILE_DIST_SQ);

        assert!(client.entities.get(stale).is_none());
        assert!(client.entities.get(wall).is_some(), "static geometry survives");
    }

    #[test]
    fn test_remote_entities_ease_toward_authority() {
        let host = host_world();
        let snapshot = capture(&host, 1000);

        let mut client = SimContext::new_offline();
        apply_snapshot(&mut client, &snapshot, None, 1.0, RECONCILE_DIST_SQ);

        let enemy_id = host
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Enemy)
            .unwrap()
            .id;
        client.entities.get_mut(enemy_id).unwrap().position = Vec2::new(-300.0, 0.0);

        // Half-way lerp
        apply_snapshot(&mut client, &snapshot, None, 0.5, RECONCILE_DIST_SQ);
        let p = client.entities.get(enemy_id).unwrap().position;
        assert!((p.x - (-250.0)).abs() < 0.5, "got {}", p.x);
    }

    #[test]
    fn test_latest_strategy_applies_newest_once() {
        let host = host_world();
        let mut strategy = LatestSnapshot::default();
        let mut older = capture(&host, 1000);
        older.tick = 10;
        let mut newer = capture(&host, 1100);
        newer.tick = 13;

        strategy.ingest(newer.clone());
        strategy.ingest(older);

        let sampled = strategy.sample(0).expect("one snapshot pending");
        assert_eq!(sampled.tick, 13);
        assert!(strategy.sample(0).is_none(), "consumed exactly once");
    }

    #[test]
    fn test_buffered_interpolation_midpoint() {
        let mut host = host_world();
        let local = host.local_player.unwrap();
        let mut strategy = BufferedInterpolation::new(100);

        let a = capture(&host, 1000);
        host.entities.get_mut(local).unwrap().position = Vec2::new(200.0, 50.0);
        let mut b = capture(&host, 1200);
        b.tick += 3;

        strategy.ingest(a);
        strategy.ingest(b);

        // Render time 1100, exactly between the two snapshots
        let sampled = strategy.sample(1200).unwrap();
        let e = sampled.entities.iter().find(|e| e.id == local).unwrap();
        assert!((e.position.x - 150.0).abs() < 0.5, "got {}", e.position.x);
    }

    #[test]
    fn test_buffered_interpolation_single_snapshot_snaps() {
        let host = host_world();
        let mut strategy = BufferedInterpolation::new(100);
        strategy.ingest(capture(&host, 1000));

        let sampled = strategy.sample(5000).unwrap();
        assert_eq!(sampled.timestamp_ms, 1000);
    }

    #[test]
    fn test_buffered_buffer_is_bounded() {
        let host = host_world();
        let mut strategy = BufferedInterpolation::new(100);
        for i in 0..(net_consts::SNAPSHOT_BUFFER as u64 + 10) {
            strategy.ingest(capture(&host, 1000 + i * 100));
        }
        assert!(strategy.buffer.len() <= net_consts::SNAPSHOT_BUFFER);
    }
}
