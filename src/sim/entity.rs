//! Entity definitions - the universal simulated object
//!
//! Every simulated thing (players, enemies, projectiles, drones, walls, food)
//! is an `Entity` distinguished by its `EntityKind`. Optional state blocks
//! (skill, AI, drone) are `Option`s that the pool clears on release.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::catalog::{SkillKind, SkillSpec, WeaponId};
use crate::sim::constants::{entity, level};
use crate::util::vec2::Vec2;

/// Unique entity identifier. Allocated from a monotonic counter, never
/// reused even though the backing storage is pooled.
pub type EntityId = u64;

/// Faction id. Team 0 is neutral and takes damage from everyone.
pub type Team = u8;

/// Food tiers dropped as loot and scattered by map generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodTier {
    Crumb,
    Chunk,
    Feast,
}

impl FoodTier {
    pub fn xp(&self) -> f32 {
        match self {
            FoodTier::Crumb => 6.0,
            FoodTier::Chunk => 18.0,
            FoodTier::Feast => 60.0,
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            FoodTier::Crumb => 6.0,
            FoodTier::Chunk => 10.0,
            FoodTier::Feast => 16.0,
        }
    }
}

/// Drone chassis variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroneVariant {
    Fighter,
    Guardian,
}

/// Tagged kind for every simulated object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    /// Practice target: always self-heals to max instead of dying
    Dummy,
    Food(FoodTier),
    Bullet,
    Missile,
    Laser,
    Trap,
    /// Slow expanding projectile resolved in the discrete regime
    Wave,
    Drone(DroneVariant),
    Wall,
    Zone,
    /// Decorative-only, no collision response
    Marker,
}

impl EntityKind {
    /// Fast projectile kinds resolved with swept (continuous) collision
    pub fn is_swept_projectile(&self) -> bool {
        matches!(
            self,
            EntityKind::Bullet | EntityKind::Missile | EntityKind::Laser | EntityKind::Trap
        )
    }

    pub fn is_projectile(&self) -> bool {
        self.is_swept_projectile() || matches!(self, EntityKind::Wave)
    }

    /// Body kinds resolved with discrete circle overlap
    pub fn is_body(&self) -> bool {
        matches!(
            self,
            EntityKind::Player
                | EntityKind::Enemy
                | EntityKind::Dummy
                | EntityKind::Food(_)
                | EntityKind::Drone(_)
        )
    }

    /// Static map geometry, never removed by snapshot application
    pub fn is_static(&self) -> bool {
        matches!(self, EntityKind::Wall | EntityKind::Zone | EntityKind::Marker)
    }

    pub fn is_drone(&self) -> bool {
        matches!(self, EntityKind::Drone(_))
    }
}

/// Timed status modifier kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Burn,
    Freeze,
    Shock,
    Corrosion,
}

impl From<crate::catalog::Element> for StatusKind {
    fn from(e: crate::catalog::Element) -> Self {
        match e {
            crate::catalog::Element::Burn => StatusKind::Burn,
            crate::catalog::Element::Freeze => StatusKind::Freeze,
            crate::catalog::Element::Shock => StatusKind::Shock,
            crate::catalog::Element::Corrosion => StatusKind::Corrosion,
        }
    }
}

/// A timed status effect attached to an entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Seconds until the effect self-removes
    pub remaining: f32,
    /// Damage per application (burn/corrosion) or unused (freeze/shock)
    pub magnitude: f32,
    /// Accumulator toward the next periodic application
    pub cadence: f32,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, remaining: f32, magnitude: f32) -> Self {
        Self {
            kind,
            remaining,
            magnitude,
            cadence: 0.0,
        }
    }
}

/// Per-entity skill state: one cooldown gate, one duration window
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SkillState {
    pub kind: SkillKind,
    pub active: bool,
    /// Seconds until the skill can be (re)activated
    pub cooldown_left: f32,
    /// Seconds the active effect persists
    pub duration_left: f32,
    /// Timer used by interval-type skills (beam-on-interval)
    pub interval_timer: f32,
    /// Configured cooldown/duration from the catalog
    pub cooldown: f32,
    pub duration: f32,
}

impl SkillState {
    pub fn from_spec(spec: &SkillSpec) -> Self {
        Self {
            kind: spec.kind,
            active: false,
            cooldown_left: 0.0,
            duration_left: 0.0,
            interval_timer: 0.0,
            cooldown: spec.cooldown,
            duration: spec.duration,
        }
    }

    pub fn ready(&self) -> bool {
        self.cooldown_left <= 0.0
    }
}

/// AI steering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiMode {
    Idle,
    Seek,
}

/// AI state for autonomous combatants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiState {
    pub mode: AiMode,
    /// Weak target reference, revalidated every use
    pub target: Option<EntityId>,
    pub acquire_radius: f32,
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            mode: AiMode::Idle,
            target: None,
            acquire_radius: crate::sim::constants::ai::ACQUIRE_RADIUS,
        }
    }
}

/// Drone behavior mode, stored explicitly so transitions are observable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroneMode {
    Idle,
    Orbit,
    Attack,
    Repel,
}

/// Drone state block
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DroneState {
    pub mode: DroneMode,
    /// Current angle on the orbit ring
    pub orbit_angle: f32,
}

impl Default for DroneState {
    fn default() -> Self {
        Self {
            mode: DroneMode::Idle,
            orbit_angle: 0.0,
        }
    }
}

/// The universal simulated object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    // Hot fields, touched every tick
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub radius: f32,
    /// Hit points
    pub health: f32,
    pub max_health: f32,
    /// Remaining seconds before a projectile despawns (projectile kinds only)
    pub lifetime: Option<f32>,
    pub team: Team,
    pub kind: EntityKind,

    // Combat and progression
    /// Weak reference into the live list; the owner may have died
    pub owner: Option<EntityId>,
    pub weapon: Option<WeaponId>,
    /// Damage on contact, fixed at fire time (projectile kinds only)
    pub damage: f32,
    /// Root owner of the last damage taken, for kill accounting
    pub last_hit_by: Option<EntityId>,
    /// Seconds until the next volley may start
    pub reload: f32,
    /// Per-barrel delay timers for staggered volleys
    pub recoil: SmallVec<[f32; 4]>,
    pub effects: SmallVec<[StatusEffect; 4]>,
    pub skill: Option<SkillState>,
    pub ai: Option<AiState>,
    pub drone: Option<DroneState>,
    /// Rectangular extent for map geometry (walls/zones) instead of radius
    pub extent: Option<Vec2>,

    pub score: u32,
    pub level: u32,
    pub xp: f32,
    pub kill_streak: u32,
    /// Invulnerable ("god") mode
    pub god: bool,
    /// Set on shrapnel so it can never trigger another area-damage event
    pub shrapnel: bool,
    /// Simulation time of the last damage transaction from a living attacker
    pub last_combat: f64,

    pub name: String,
    pub id: EntityId,
}

/// Spawn template merged over entity defaults by the pool
#[derive(Debug, Clone, Default)]
pub struct EntityTemplate {
    pub kind: Option<EntityKind>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub radius: Option<f32>,
    pub health: Option<f32>,
    pub lifetime: Option<f32>,
    pub team: Team,
    pub owner: Option<EntityId>,
    pub weapon: Option<WeaponId>,
    pub damage: f32,
    pub skill: Option<SkillState>,
    pub ai: Option<AiState>,
    pub drone: Option<DroneState>,
    pub extent: Option<Vec2>,
    pub shrapnel: bool,
    pub name: Option<String>,
}

impl Entity {
    /// Blank entity used to populate the pool; overwritten by `reset`
    pub(crate) fn blank() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            radius: entity::BASE_RADIUS,
            health: 1.0,
            max_health: 1.0,
            lifetime: None,
            team: 0,
            kind: EntityKind::Marker,
            owner: None,
            weapon: None,
            damage: 0.0,
            last_hit_by: None,
            reload: 0.0,
            recoil: SmallVec::new(),
            effects: SmallVec::new(),
            skill: None,
            ai: None,
            drone: None,
            extent: None,
            score: 0,
            level: 1,
            xp: 0.0,
            kill_streak: 0,
            god: false,
            shrapnel: false,
            last_combat: 0.0,
            name: String::new(),
            id: 0,
        }
    }

    /// Reinitialize from defaults merged with the caller's template
    pub(crate) fn reset(&mut self, id: EntityId, template: EntityTemplate) {
        let kind = template.kind.unwrap_or(EntityKind::Marker);
        let health = template.health.unwrap_or(match kind {
            EntityKind::Player => entity::PLAYER_HEALTH,
            EntityKind::Enemy => 40.0,
            EntityKind::Dummy => 80.0,
            EntityKind::Drone(_) => crate::sim::constants::drones::HEALTH,
            _ => 1.0,
        });

        self.position = template.position;
        self.velocity = template.velocity;
        self.rotation = template.rotation;
        self.radius = template.radius.unwrap_or(match kind {
            EntityKind::Food(tier) => tier.radius(),
            EntityKind::Drone(_) => crate::sim::constants::drones::RADIUS,
            _ => entity::BASE_RADIUS,
        });
        self.health = health;
        self.max_health = health;
        self.lifetime = template.lifetime;
        self.team = template.team;
        self.kind = kind;
        self.owner = template.owner;
        self.weapon = template.weapon;
        self.damage = template.damage;
        self.last_hit_by = None;
        self.reload = 0.0;
        self.recoil.clear();
        self.effects.clear();
        self.skill = template.skill;
        self.ai = template.ai;
        self.drone = template.drone;
        self.extent = template.extent;
        self.score = 0;
        self.level = 1;
        self.xp = 0.0;
        self.kill_streak = 0;
        self.god = false;
        self.shrapnel = template.shrapnel;
        self.last_combat = 0.0;
        self.name = template.name.unwrap_or_default();
        self.id = id;
    }

    /// Clear every optional field so nothing stale leaks into the next reuse
    pub(crate) fn clear_for_release(&mut self) {
        self.owner = None;
        self.weapon = None;
        self.damage = 0.0;
        self.last_hit_by = None;
        self.lifetime = None;
        self.skill = None;
        self.ai = None;
        self.drone = None;
        self.extent = None;
        self.effects.clear();
        self.recoil.clear();
        self.name.clear();
        self.velocity = Vec2::ZERO;
        self.id = 0;
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// XP threshold for the next level (exponential growth)
    pub fn xp_threshold(&self) -> f32 {
        level::XP_BASE * level::XP_GROWTH.powi(self.level as i32 - 1)
    }

    /// Grant XP, consuming thresholds one level at a time
    ///
    /// Each level-up is re-evaluated against the new, higher threshold so a
    /// large grant can cross several levels in one call.
    pub fn grant_xp(&mut self, amount: f32) -> u32 {
        let mut levels_gained = 0;
        self.xp += amount;
        while self.xp >= self.xp_threshold() {
            self.xp -= self.xp_threshold();
            self.level += 1;
            levels_gained += 1;
        }
        if levels_gained > 0 && self.kind == EntityKind::Player {
            self.radius = entity::BASE_RADIUS + (self.level - 1) as f32 * entity::RADIUS_PER_LEVEL;
        }
        levels_gained
    }

    pub fn effect_mut(&mut self, kind: StatusKind) -> Option<&mut StatusEffect> {
        self.effects.iter_mut().find(|e| e.kind == kind)
    }

    /// Attach or refresh a status effect
    pub fn apply_effect(&mut self, effect: StatusEffect) {
        match self.effect_mut(effect.kind) {
            Some(existing) => {
                existing.remaining = existing.remaining.max(effect.remaining);
                existing.magnitude = existing.magnitude.max(effect.magnitude);
            }
            None => self.effects.push(effect),
        }
    }

    pub fn has_active_skill(&self, kind: SkillKind) -> bool {
        self.skill.map_or(false, |s| s.kind == kind && s.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_regimes_are_disjoint() {
        let kinds = [
            EntityKind::Player,
            EntityKind::Enemy,
            EntityKind::Dummy,
            EntityKind::Food(FoodTier::Crumb),
            EntityKind::Bullet,
            EntityKind::Missile,
            EntityKind::Laser,
            EntityKind::Trap,
            EntityKind::Wave,
            EntityKind::Drone(DroneVariant::Fighter),
            EntityKind::Wall,
            EntityKind::Zone,
            EntityKind::Marker,
        ];
        for kind in kinds {
            assert!(
                !(kind.is_swept_projectile() && kind.is_body()),
                "{:?} is in both regimes",
                kind
            );
        }
        assert!(EntityKind::Wall.is_static());
        assert!(!EntityKind::Player.is_static());
    }

    #[test]
    fn test_xp_exact_threshold_is_one_level_zero_residual() {
        let mut e = Entity::blank();
        e.kind = EntityKind::Player;
        e.id = 1;

        let threshold = e.xp_threshold();
        let gained = e.grant_xp(threshold);

        assert_eq!(gained, 1);
        assert_eq!(e.level, 2);
        assert_eq!(e.xp, 0.0);
    }

    #[test]
    fn test_xp_large_grant_crosses_multiple_levels() {
        let mut e = Entity::blank();
        e.kind = EntityKind::Player;
        e.id = 1;

        // Enough for levels 1->2 and 2->3, each against the grown threshold
        let grant = level::XP_BASE + level::XP_BASE * level::XP_GROWTH + 1.0;
        let gained = e.grant_xp(grant);

        assert_eq!(gained, 2);
        assert_eq!(e.level, 3);
        assert!((e.xp - 1.0).abs() < 1e-3);
        // Below the level-4 threshold
        assert!(e.xp < e.xp_threshold());
    }

    #[test]
    fn test_level_up_grows_radius() {
        let mut e = Entity::blank();
        e.kind = EntityKind::Player;
        let before = e.radius;
        e.grant_xp(e.xp_threshold());
        assert!(e.radius > before);
    }

    #[test]
    fn test_apply_effect_refreshes_instead_of_stacking() {
        let mut e = Entity::blank();
        e.apply_effect(StatusEffect::new(StatusKind::Burn, 2.0, 1.0));
        e.apply_effect(StatusEffect::new(StatusKind::Burn, 4.0, 0.5));

        assert_eq!(e.effects.len(), 1);
        let burn = e.effect_mut(StatusKind::Burn).unwrap();
        assert_eq!(burn.remaining, 4.0);
        assert_eq!(burn.magnitude, 1.0);
    }

    #[test]
    fn test_clear_for_release_drops_optionals() {
        let mut e = Entity::blank();
        e.owner = Some(42);
        e.ai = Some(AiState::default());
        e.lifetime = Some(1.0);
        e.recoil.push(0.5);
        e.effects.push(StatusEffect::new(StatusKind::Shock, 1.0, 0.0));

        e.clear_for_release();

        assert!(e.owner.is_none());
        assert!(e.ai.is_none());
        assert!(e.lifetime.is_none());
        assert!(e.recoil.is_empty());
        assert!(e.effects.is_empty());
    }
}
