//! The simulation context: single owner of all live state
//!
//! `SimContext::step` runs the whole pipeline for one fixed step, in a
//! fixed order, on one thread. Systems are free functions that borrow the
//! context; nothing else holds a competing copy of simulation state.

use std::sync::Arc;

use hashbrown::HashMap;
use rand::Rng;

use crate::catalog::{WeaponCatalog, WeaponId};
use crate::net::protocol::InputFrame;
use crate::sim::constants::{entity as entity_consts, world_event};
use crate::sim::entity::{
    AiState, DroneState, DroneVariant, EntityId, EntityKind, EntityTemplate, FoodTier, SkillState,
    Team,
};
use crate::sim::events::{
    AudioCue, ChatLine, Feed, KillFeedEntry, LeaderboardEntry, SandboxSignals, UiStats, WorldEvent,
    WorldEventKind,
};
use crate::sim::pool::{EntityPool, Particle, ParticlePool};
use crate::sim::spatial::SpatialHash;
use crate::sim::systems;
use crate::sim::systems::movement::Camera;
use crate::util::vec2::Vec2;

/// Health at or above this marks an enemy as a boss for the UI
const BOSS_HEALTH: f32 = 600.0;

pub struct SimContext {
    pub catalog: Arc<WeaponCatalog>,
    pub entities: EntityPool,
    pub particles: ParticlePool,
    pub grid: SpatialHash,
    pub camera: Camera,
    /// Latest input per controlled entity, human and AI alike
    pub inputs: HashMap<EntityId, InputFrame>,
    pub local_player: Option<EntityId>,
    pub tick: u64,
    /// Simulation seconds since start
    pub time: f64,
    /// Arena half-extents; bodies are clamped inside
    pub arena_half: Vec2,
    pub world_event: Option<WorldEvent>,
    next_event_in: f32,
    swarm_spawn_in: f32,
    /// Collaborator-written signal counters
    pub signals: SandboxSignals,
    signals_seen: SandboxSignals,
    pub audio: Vec<AudioCue>,
    pub kill_feed: Feed<KillFeedEntry>,
    pub chat_log: Feed<ChatLine>,
}

impl SimContext {
    pub fn new(catalog: Arc<WeaponCatalog>, arena_half: Vec2) -> Self {
        Self {
            catalog,
            entities: EntityPool::default(),
            particles: ParticlePool::default(),
            grid: SpatialHash::new(),
            camera: Camera::default(),
            inputs: HashMap::new(),
            local_player: None,
            tick: 0,
            time: 0.0,
            arena_half,
            world_event: None,
            next_event_in: world_event::MIN_INTERVAL,
            swarm_spawn_in: 0.0,
            signals: SandboxSignals::default(),
            signals_seen: SandboxSignals::default(),
            audio: Vec::new(),
            kill_feed: Feed::new(),
            chat_log: Feed::new(),
        }
    }

    /// Standalone context with the builtin catalog, for offline play and tests
    pub fn new_offline() -> Self {
        Self::new(Arc::new(WeaponCatalog::builtin()), Vec2::new(4000.0, 4000.0))
    }

    /// Advance one fixed step. Order matters: inputs resolve before
    /// weapons, weapons before collision, deaths resolve last.
    pub fn step(&mut self, dt: f32) {
        self.tick += 1;
        self.time += dt as f64;

        self.update_world_event(dt);
        self.consume_signals();

        systems::movement::update(self, dt);
        systems::skills::update(self, dt);
        systems::ai::update(self, dt);
        systems::drones::update(self, dt);
        systems::weapons::update(self, dt);
        systems::collision::update(self, dt);

        self.particles.update(dt);
        systems::movement::update_camera(self, dt);
    }

    fn update_world_event(&mut self, dt: f32) {
        match self.world_event.as_mut() {
            Some(event) => {
                event.remaining -= dt;
                if event.remaining <= 0.0 {
                    self.world_event = None;
                    let mut rng = rand::thread_rng();
                    self.next_event_in =
                        rng.gen_range(world_event::MIN_INTERVAL..=world_event::MAX_INTERVAL);
                    return;
                }
                let kind = event.kind;
                if kind == WorldEventKind::Swarm {
                    self.swarm_spawn_in -= dt;
                    if self.swarm_spawn_in <= 0.0 {
                        self.swarm_spawn_in = world_event::SWARM_SPAWN_INTERVAL;
                        // Swarm enemies come in from the arena rim
                        let mut rng = rand::thread_rng();
                        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                        let position = Vec2::new(
                            angle.cos() * self.arena_half.x * 0.85,
                            angle.sin() * self.arena_half.y * 0.85,
                        );
                        self.spawn_enemy(position, 0);
                    }
                }
            }
            None => {
                self.next_event_in -= dt;
                if self.next_event_in <= 0.0 {
                    let mut rng = rand::thread_rng();
                    let kind = match rng.gen_range(0..3u8) {
                        0 => WorldEventKind::DoubleXp,
                        1 => WorldEventKind::Swarm,
                        _ => WorldEventKind::Bounty,
                    };
                    self.world_event = Some(WorldEvent::start(kind));
                    self.swarm_spawn_in = 0.0;
                }
            }
        }
    }

    /// Execute sandbox signals incremented since the last tick, exactly once
    /// per increment
    fn consume_signals(&mut self) {
        let delta = self.signals.delta(&self.signals_seen);
        self.signals_seen = self.signals;
        if delta.is_empty() {
            return;
        }

        for _ in 0..delta.spawn_boss {
            let mut rng = rand::thread_rng();
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let position = Vec2::from_angle(angle) * (self.arena_half.x * 0.6);
            self.spawn_boss(position);
        }
        if delta.heal_player > 0 {
            if let Some(player) = self.local_player.and_then(|id| self.entities.get_mut(id)) {
                player.health = player.max_health;
            }
        }
        if delta.reset_level > 0 {
            if let Some(player) = self.local_player.and_then(|id| self.entities.get_mut(id)) {
                player.level = 1;
                player.xp = 0.0;
                player.radius = entity_consts::BASE_RADIUS;
            }
        }
        for _ in 0..delta.clear_enemies {
            self.entities.release_where(|e| e.kind == EntityKind::Enemy);
        }
        for _ in 0..delta.grant_level {
            if let Some(player) = self.local_player.and_then(|id| self.entities.get_mut(id)) {
                let needed = player.xp_threshold() - player.xp;
                player.grant_xp(needed);
            }
        }
        if delta.toggle_god % 2 == 1 {
            if let Some(player) = self.local_player.and_then(|id| self.entities.get_mut(id)) {
                player.god = !player.god;
            }
        }
    }

    pub fn xp_multiplier(&self) -> f32 {
        self.world_event.map(|e| e.xp_multiplier()).unwrap_or(1.0)
    }

    pub fn score_multiplier(&self) -> u32 {
        self.world_event.map(|e| e.score_multiplier()).unwrap_or(1)
    }

    // Spawning ----------------------------------------------------------

    fn skill_for(&self, weapon: WeaponId) -> Option<SkillState> {
        self.catalog
            .get(weapon)
            .and_then(|w| w.skill.as_ref())
            .map(SkillState::from_spec)
    }

    pub fn spawn_player(&mut self, name: &str, position: Vec2, team: Team) -> Option<EntityId> {
        let weapon = 1;
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Player),
            position,
            team,
            weapon: Some(weapon),
            skill: self.skill_for(weapon),
            name: Some(name.to_string()),
            ..Default::default()
        })
    }

    pub fn spawn_enemy(&mut self, position: Vec2, team: Team) -> Option<EntityId> {
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Enemy),
            position,
            team,
            weapon: Some(1),
            ai: Some(AiState::default()),
            ..Default::default()
        })
    }

    pub fn spawn_boss(&mut self, position: Vec2) -> Option<EntityId> {
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Enemy),
            position,
            team: 0,
            health: Some(BOSS_HEALTH),
            radius: Some(entity_consts::BASE_RADIUS * 3.0),
            weapon: Some(3),
            ai: Some(AiState {
                acquire_radius: crate::sim::constants::ai::ACQUIRE_RADIUS * 2.0,
                ..Default::default()
            }),
            name: Some("Boss".to_string()),
            ..Default::default()
        })
    }

    pub fn spawn_dummy(&mut self, position: Vec2) -> Option<EntityId> {
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Dummy),
            position,
            team: 0,
            ..Default::default()
        })
    }

    pub fn spawn_food(&mut self, position: Vec2, tier: FoodTier) -> Option<EntityId> {
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Food(tier)),
            position,
            team: 0,
            ..Default::default()
        })
    }

    pub fn spawn_wall(&mut self, center: Vec2, half_extent: Vec2) -> Option<EntityId> {
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Wall),
            position: center,
            extent: Some(half_extent),
            ..Default::default()
        })
    }

    pub fn spawn_drone(&mut self, owner: EntityId, position: Vec2, team: Team) -> Option<EntityId> {
        self.entities.acquire(EntityTemplate {
            kind: Some(EntityKind::Drone(DroneVariant::Fighter)),
            position,
            team,
            owner: Some(owner),
            drone: Some(DroneState::default()),
            ..Default::default()
        })
    }

    /// Cosmetic particle burst
    pub fn spawn_burst(&mut self, position: Vec2, count: usize, hue: f32) {
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let speed = rng.gen_range(40.0..160.0);
            self.particles.spawn(Particle {
                position,
                velocity: Vec2::from_angle(angle) * speed,
                lifetime: rng.gen_range(0.2..0.6),
                size: rng.gen_range(1.5..4.0),
                hue,
            });
        }
    }

    /// Scatter starting food and obstacles across the arena
    pub fn generate_arena(&mut self, food: usize, walls: usize) {
        let mut rng = rand::thread_rng();
        let margin = 100.0;
        for _ in 0..food {
            let tier = match rng.gen_range(0..10u8) {
                0 => FoodTier::Feast,
                1..=3 => FoodTier::Chunk,
                _ => FoodTier::Crumb,
            };
            let position = Vec2::new(
                rng.gen_range(-(self.arena_half.x - margin)..=(self.arena_half.x - margin)),
                rng.gen_range(-(self.arena_half.y - margin)..=(self.arena_half.y - margin)),
            );
            self.spawn_food(position, tier);
        }
        for _ in 0..walls {
            let position = Vec2::new(
                rng.gen_range(-(self.arena_half.x - margin)..=(self.arena_half.x - margin)),
                rng.gen_range(-(self.arena_half.y - margin)..=(self.arena_half.y - margin)),
            );
            let half = Vec2::new(rng.gen_range(30.0..160.0), rng.gen_range(30.0..160.0));
            self.spawn_wall(position, half);
        }
    }

    // Collaborator outputs ----------------------------------------------

    /// Drain queued audio cues; fire-and-forget, no ordering guarantee
    pub fn drain_audio(&mut self) -> Vec<AudioCue> {
        std::mem::take(&mut self.audio)
    }

    /// Periodic snapshot for the stats/UI collaborator
    pub fn ui_stats(&self) -> UiStats {
        let local = self.local_player.and_then(|id| self.entities.get(id));

        let mut leaderboard: Vec<LeaderboardEntry> = self
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Player)
            .map(|e| LeaderboardEntry {
                name: e.name.clone(),
                score: e.score,
                level: e.level,
            })
            .collect();
        leaderboard.sort_by(|a, b| b.score.cmp(&a.score));
        leaderboard.truncate(10);

        let boss_health = self
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Enemy && e.max_health >= BOSS_HEALTH)
            .map(|e| (e.health, e.max_health))
            .next();

        UiStats {
            score: local.map(|e| e.score).unwrap_or(0),
            level: local.map(|e| e.level).unwrap_or(1),
            xp: local.map(|e| e.xp).unwrap_or(0.0),
            xp_threshold: local.map(|e| e.xp_threshold()).unwrap_or(0.0),
            position: local.map(|e| e.position).unwrap_or(Vec2::ZERO),
            health: local.map(|e| e.health).unwrap_or(0.0),
            max_health: local.map(|e| e.max_health).unwrap_or(0.0),
            skill_cooldown: local
                .and_then(|e| e.skill)
                .map(|s| s.cooldown_left.max(0.0))
                .unwrap_or(0.0),
            leaderboard,
            boss_health,
            kill_feed: self.kill_feed.entries().to_vec(),
            chat_log: self.chat_log.entries().to_vec(),
            world_event: self.world_event.map(|e| e.kind),
            live_entities: self.entities.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::constants::tick::DT;

    #[test]
    fn test_step_pipeline_smoke() {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("p", Vec2::ZERO, 1).unwrap();
        ctx.local_player = Some(player);
        ctx.spawn_enemy(Vec2::new(300.0, 0.0), 2).unwrap();
        ctx.generate_arena(20, 4);

        for _ in 0..120 {
            ctx.step(DT);
        }

        assert_eq!(ctx.tick, 120);
        assert!(ctx.entities.len() <= ctx.entities.cap());
        for e in ctx.entities.iter() {
            assert!(e.position.is_finite(), "{:?} has non-finite position", e.kind);
        }
    }

    #[test]
    fn test_heal_signal_consumed_exactly_once() {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("p", Vec2::ZERO, 1).unwrap();
        ctx.local_player = Some(player);
        ctx.entities.get_mut(player).unwrap().health = 40.0;

        ctx.signals.heal_player += 1;
        ctx.step(DT);
        assert_eq!(
            ctx.entities.get(player).unwrap().health,
            entity_consts::PLAYER_HEALTH
        );

        // Same counter value again: the signal must not re-fire
        ctx.entities.get_mut(player).unwrap().health = 40.0;
        ctx.step(DT);
        assert_eq!(ctx.entities.get(player).unwrap().health, 40.0);
    }

    #[test]
    fn test_grant_level_signal_levels_once_per_increment() {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("p", Vec2::ZERO, 1).unwrap();
        ctx.local_player = Some(player);

        ctx.signals.grant_level += 2;
        ctx.step(DT);
        assert_eq!(ctx.entities.get(player).unwrap().level, 3);

        ctx.step(DT);
        assert_eq!(ctx.entities.get(player).unwrap().level, 3);
    }

    #[test]
    fn test_clear_enemies_signal_spares_players() {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("p", Vec2::ZERO, 1).unwrap();
        ctx.spawn_enemy(Vec2::new(2000.0, 2000.0), 2).unwrap();
        ctx.spawn_enemy(Vec2::new(-2000.0, 2000.0), 2).unwrap();

        ctx.signals.clear_enemies += 1;
        ctx.step(DT);

        assert!(ctx.entities.get(player).is_some());
        assert_eq!(
            ctx.entities
                .iter()
                .filter(|e| e.kind == EntityKind::Enemy)
                .count(),
            0
        );
    }

    #[test]
    fn test_toggle_god_signal() {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("p", Vec2::ZERO, 1).unwrap();
        ctx.local_player = Some(player);

        ctx.signals.toggle_god += 1;
        ctx.step(DT);
        assert!(ctx.entities.get(player).unwrap().god);

        ctx.signals.toggle_god += 1;
        ctx.step(DT);
        assert!(!ctx.entities.get(player).unwrap().god);
    }

    #[test]
    fn test_world_event_expires() {
        let mut ctx = SimContext::new_offline();
        ctx.world_event = Some(WorldEvent {
            kind: WorldEventKind::DoubleXp,
            remaining: DT * 2.5,
        });
        assert_eq!(ctx.xp_multiplier(), world_event::XP_MULTIPLIER);

        for _ in 0..4 {
            ctx.step(DT);
        }
        assert!(ctx.world_event.is_none());
        assert_eq!(ctx.xp_multiplier(), 1.0);
    }

    #[test]
    fn test_swarm_event_spawns_extra_enemies() {
        let mut ctx = SimContext::new_offline();
        ctx.world_event = Some(WorldEvent {
            kind: WorldEventKind::Swarm,
            remaining: 10.0,
        });

        let enemies = |ctx: &SimContext| {
            ctx.entities
                .iter()
                .filter(|e| e.kind == EntityKind::Enemy)
                .count()
        };
        let before = enemies(&ctx);

        // Three seconds covers at least one spawn interval
        for _ in 0..90 {
            ctx.step(DT);
        }

        assert!(
            enemies(&ctx) > before,
            "swarm should add enemies beyond {}",
            before
        );
    }

    #[test]
    fn test_boss_signal_and_ui_boss_health() {
        let mut ctx = SimContext::new_offline();
        let player = ctx.spawn_player("p", Vec2::ZERO, 1).unwrap();
        ctx.local_player = Some(player);

        ctx.signals.spawn_boss += 1;
        ctx.step(DT);

        let stats = ctx.ui_stats();
        let (health, max) = stats.boss_health.expect("boss should be live");
        assert_eq!(max, BOSS_HEALTH);
        assert!(health > 0.0);
    }

    #[test]
    fn test_ui_leaderboard_sorted_by_score() {
        let mut ctx = SimContext::new_offline();
        let a = ctx.spawn_player("low", Vec2::ZERO, 1).unwrap();
        let b = ctx.spawn_player("high", Vec2::new(500.0, 0.0), 2).unwrap();
        ctx.entities.get_mut(a).unwrap().score = 10;
        ctx.entities.get_mut(b).unwrap().score = 90;

        let stats = ctx.ui_stats();
        assert_eq!(stats.leaderboard[0].name, "high");
        assert_eq!(stats.leaderboard[1].name, "low");
    }

    #[test]
    fn test_drain_audio_empties_queue() {
        let mut ctx = SimContext::new_offline();
        ctx.audio.push(AudioCue::Shot);
        ctx.audio.push(AudioCue::Hit);

        let drained = ctx.drain_audio();
        assert_eq!(drained.len(), 2);
        assert!(ctx.audio.is_empty());
    }

    #[test]
    fn test_arena_generation_stays_in_bounds() {
        let mut ctx = SimContext::new_offline();
        ctx.generate_arena(50, 8);

        let food = ctx
            .entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Food(_)))
            .count();
        let walls = ctx
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Wall)
            .count();
        assert_eq!(food, 50);
        assert_eq!(walls, 8);
        for e in ctx.entities.iter() {
            assert!(e.position.x.abs() <= ctx.arena_half.x);
            assert!(e.position.y.abs() <= ctx.arena_half.y);
        }
    }
}
