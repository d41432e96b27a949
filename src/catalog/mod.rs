//! Read-only weapon/skill content catalog
//!
//! A keyed table of weapon schemas consumed by the simulation core. The core
//! never mutates it; a handle is shared into the simulation context. Schemas
//! can be loaded from JSON or taken from the builtin table.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Key into the catalog, stable across sessions
pub type WeaponId = u32;

/// Closed set of firing archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponArchetype {
    /// Spawns projectile entities from each barrel
    Projectile,
    /// Instant-hit scan over range and a forward cone, once per activation
    Beam,
    /// Drops a stationary trap entity
    Trap,
    /// Summons an autonomous drone, capped per owner
    DroneSummon,
    /// Continuous spray of short-lived wave projectiles while firing
    Cone,
}

/// Elemental effect tag attached to weapon hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Burn,
    Freeze,
    Shock,
    Corrosion,
}

/// Closed set of skill tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillKind {
    /// One-shot forward impulse
    Dash,
    /// Damage reduction while active
    Shield,
    /// Flat damage reduction while active
    Armor,
    /// Returns a fraction of received damage to the attacker
    Reflect,
    /// One-shot jump to the cursor position
    Teleport,
    /// One-shot shock applied to everything in a radius
    Emp,
    /// Area pull-and-slow field around the owner
    Gravity,
    /// Heals a fraction of damage dealt while active
    Lifesteal,
    /// Fires a free beam on a fixed interval while active
    IntervalBeam,
    /// One-shot arc to the nearest enemy
    ChainLightning,
    /// Stationary high-damage mode: movement frozen, damage boosted
    Turret,
    /// One-shot reset of all barrel and reload timers
    BurstReload,
    /// Shrinks AI acquisition range against the owner
    Stealth,
    /// Speed multiplier while active
    Overdrive,
}

/// Skill descriptor attached to a weapon schema
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SkillSpec {
    pub kind: SkillKind,
    /// Seconds between activations
    pub cooldown: f32,
    /// Seconds the active flag and per-tick effect persist
    pub duration: f32,
}

/// One barrel of a weapon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barrel {
    /// Muzzle offset from the entity center (x lateral, y forward)
    pub offset: Vec2,
    pub width: f32,
    pub length: f32,
    /// Barrel angle relative to the entity's facing (radians)
    pub angle: f32,
    /// Extra delay before this barrel fires within a volley (seconds)
    pub delay: f32,
}

impl Default for Barrel {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            width: 8.0,
            length: 24.0,
            angle: 0.0,
            delay: 0.0,
        }
    }
}

/// Static weapon schema (read-only input to the core)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponSchema {
    pub id: WeaponId,
    pub name: String,
    pub tier: u8,
    pub archetype: WeaponArchetype,
    pub barrels: Vec<Barrel>,
    pub damage: f32,
    /// Seconds between volleys
    pub reload: f32,
    pub range: f32,
    /// Projectile speed (units/second)
    pub speed: f32,
    /// Angular spread in radians
    pub spread: f32,
    /// Shooter knockback scale
    pub recoil: f32,
    pub bullet_size: f32,
    pub bullet_count: u32,
    /// Explosive payloads detonate into area damage plus a shrapnel fan
    #[serde(default)]
    pub explosive: bool,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default)]
    pub skill: Option<SkillSpec>,
    /// Maximum simultaneously alive drones per owner (DroneSummon only)
    #[serde(default = "default_max_drones")]
    pub max_drones: u32,
    /// Half-angle of the beam/cone scan in radians
    #[serde(default = "default_cone_half_angle")]
    pub cone_half_angle: f32,
}

fn default_max_drones() -> u32 {
    4
}

fn default_cone_half_angle() -> f32 {
    0.35
}

/// The keyed, read-only weapon table
#[derive(Debug, Clone)]
pub struct WeaponCatalog {
    weapons: HashMap<WeaponId, WeaponSchema>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate weapon id {0}")]
    DuplicateId(WeaponId),
}

impl WeaponCatalog {
    pub fn get(&self, id: WeaponId) -> Option<&WeaponSchema> {
        self.weapons.get(&id)
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponSchema> {
        self.weapons.values()
    }

    /// Load a catalog from a JSON array of weapon schemas
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let list: Vec<WeaponSchema> = serde_json::from_str(json)?;
        let mut weapons = HashMap::with_capacity(list.len());
        for schema in list {
            let id = schema.id;
            if weapons.insert(id, schema).is_some() {
                return Err(CatalogError::DuplicateId(id));
            }
        }
        Ok(Self { weapons })
    }

    /// Builtin table covering every archetype, used when no JSON is supplied
    pub fn builtin() -> Self {
        let list = vec![
            WeaponSchema {
                id: 1,
                name: "Blaster".to_string(),
                tier: 1,
                archetype: WeaponArchetype::Projectile,
                barrels: vec![Barrel::default()],
                damage: 8.0,
                reload: 0.4,
                range: 600.0,
                speed: 520.0,
                spread: 0.04,
                recoil: 0.3,
                bullet_size: 6.0,
                bullet_count: 1,
                explosive: false,
                element: None,
                skill: Some(SkillSpec {
                    kind: SkillKind::Dash,
                    cooldown: 4.0,
                    duration: 0.0,
                }),
                max_drones: 0,
                cone_half_angle: 0.0,
            },
            WeaponSchema {
                id: 2,
                name: "Twin Cannon".to_string(),
                tier: 2,
                archetype: WeaponArchetype::Projectile,
                barrels: vec![
                    Barrel {
                        offset: Vec2::new(-10.0, 0.0),
                        ..Barrel::default()
                    },
                    Barrel {
                        offset: Vec2::new(10.0, 0.0),
                        delay: 0.12,
                        ..Barrel::default()
                    },
                ],
                damage: 7.0,
                reload: 0.5,
                range: 550.0,
                speed: 500.0,
                spread: 0.06,
                recoil: 0.4,
                bullet_size: 5.0,
                bullet_count: 1,
                explosive: false,
                element: None,
                skill: Some(SkillSpec {
                    kind: SkillKind::Overdrive,
                    cooldown: 8.0,
                    duration: 3.0,
                }),
                max_drones: 0,
                cone_half_angle: 0.0,
            },
            WeaponSchema {
                id: 3,
                name: "Grenadier".to_string(),
                tier: 3,
                archetype: WeaponArchetype::Projectile,
                barrels: vec![Barrel {
                    width: 14.0,
                    ..Barrel::default()
                }],
                damage: 22.0,
                reload: 1.2,
                range: 500.0,
                speed: 380.0,
                spread: 0.02,
                recoil: 1.0,
                bullet_size: 10.0,
                bullet_count: 1,
                explosive: true,
                element: Some(Element::Burn),
                skill: Some(SkillSpec {
                    kind: SkillKind::Shield,
                    cooldown: 10.0,
                    duration: 4.0,
                }),
                max_drones: 0,
                cone_half_angle: 0.0,
            },
            WeaponSchema {
                id: 4,
                name: "Railbeam".to_string(),
                tier: 3,
                archetype: WeaponArchetype::Beam,
                barrels: vec![Barrel {
                    length: 40.0,
                    ..Barrel::default()
                }],
                damage: 30.0,
                reload: 1.6,
                range: 700.0,
                speed: 0.0,
                spread: 0.0,
                recoil: 0.8,
                bullet_size: 0.0,
                bullet_count: 0,
                explosive: false,
                element: Some(Element::Shock),
                skill: Some(SkillSpec {
                    kind: SkillKind::Teleport,
                    cooldown: 12.0,
                    duration: 0.0,
                }),
                max_drones: 0,
                cone_half_angle: 0.12,
            },
            WeaponSchema {
                id: 5,
                name: "Hive".to_string(),
                tier: 2,
                archetype: WeaponArchetype::DroneSummon,
                barrels: vec![Barrel::default()],
                damage: 5.0,
                reload: 0.8,
                range: 450.0,
                speed: 300.0,
                spread: 0.0,
                recoil: 0.0,
                bullet_size: 9.0,
                bullet_count: 1,
                explosive: false,
                element: None,
                skill: Some(SkillSpec {
                    kind: SkillKind::Stealth,
                    cooldown: 14.0,
                    duration: 5.0,
                }),
                max_drones: 4,
                cone_half_angle: 0.0,
            },
            WeaponSchema {
                id: 6,
                name: "Snare Layer".to_string(),
                tier: 2,
                archetype: WeaponArchetype::Trap,
                barrels: vec![Barrel::default()],
                damage: 18.0,
                reload: 1.4,
                range: 200.0,
                speed: 120.0,
                spread: 0.1,
                recoil: 0.0,
                bullet_size: 12.0,
                bullet_count: 1,
                explosive: false,
                element: Some(Element::Freeze),
                skill: Some(SkillSpec {
                    kind: SkillKind::Gravity,
                    cooldown: 11.0,
                    duration: 4.0,
                }),
                max_drones: 0,
                cone_half_angle: 0.0,
            },
            WeaponSchema {
                id: 7,
                name: "Flamespray".to_string(),
                tier: 2,
                archetype: WeaponArchetype::Cone,
                barrels: vec![Barrel::default()],
                damage: 2.5,
                reload: 0.1,
                range: 220.0,
                speed: 420.0,
                spread: 0.0,
                recoil: 0.1,
                bullet_size: 7.0,
                bullet_count: 3,
                explosive: false,
                element: Some(Element::Corrosion),
                skill: Some(SkillSpec {
                    kind: SkillKind::Turret,
                    cooldown: 9.0,
                    duration: 5.0,
                }),
                max_drones: 0,
                cone_half_angle: 0.45,
            },
        ];

        let mut weapons = HashMap::with_capacity(list.len());
        for schema in list {
            weapons.insert(schema.id, schema);
        }
        Self { weapons }
    }
}

impl Default for WeaponCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
