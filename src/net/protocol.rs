//! Wire types and codec
//!
//! Bincode with the legacy (fixed-size integer) config so the layout stays
//! compatible with non-Rust peers that hand-decode the frames.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::catalog::WeaponId;
use crate::sim::entity::{Entity, EntityId, EntityKind, StatusEffect, Team};
use crate::sim::pool::Particle;
use crate::util::vec2::Vec2;

/// Held directional keys, resolved into a heading by the movement system
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct KeySet {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// One tick's worth of input for one player-controlled entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputFrame {
    /// Monotonic per-client sequence; the host keeps only the latest
    pub sequence: u64,
    pub keys: KeySet,
    /// Analog stick vector, preferred over keys when present
    pub joystick: Option<Vec2>,
    /// Aim point in world coordinates
    pub cursor: Vec2,
    /// Aim angle in radians
    pub aim: f32,
    pub fire: bool,
    pub skill: bool,
}

impl InputFrame {
    /// Directional intent, normalized so diagonals are not faster
    pub fn direction(&self) -> Vec2 {
        if let Some(stick) = self.joystick {
            return stick.clamp_length(1.0);
        }
        let mut d = Vec2::ZERO;
        if self.keys.up {
            d.y -= 1.0;
        }
        if self.keys.down {
            d.y += 1.0;
        }
        if self.keys.left {
            d.x -= 1.0;
        }
        if self.keys.right {
            d.x += 1.0;
        }
        d.normalize()
    }
}

/// Messages from a client to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientPacket {
    /// Request to join with a display name
    Join { name: String },
    /// Input for the current tick
    Input(InputFrame),
    /// Chat line, relayed verbatim by the host
    Chat { text: String },
    /// Orderly departure
    Leave,
}

/// Messages from the host to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostPacket {
    /// Join confirmed with the entity id the client now controls
    Welcome { entity_id: EntityId, tick: u64 },
    /// Authoritative world state
    Snapshot(WorldSnapshot),
    /// Relayed chat line
    Chat { sender: String, text: String },
}

/// Flat per-entity state for transmission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub team: Team,
    pub owner: Option<EntityId>,
    pub weapon: Option<WeaponId>,
    pub damage: f32,
    pub lifetime: Option<f32>,
    pub extent: Option<Vec2>,
    pub level: u32,
    pub score: u32,
    pub shrapnel: bool,
    pub effects: SmallVec<[StatusEffect; 4]>,
    pub recoil: SmallVec<[f32; 4]>,
    pub name: String,
}

impl EntitySnapshot {
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            kind: entity.kind,
            position: entity.position,
            velocity: entity.velocity,
            rotation: entity.rotation,
            radius: entity.radius,
            health: entity.health,
            max_health: entity.max_health,
            team: entity.team,
            owner: entity.owner,
            weapon: entity.weapon,
            damage: entity.damage,
            lifetime: entity.lifetime,
            extent: entity.extent,
            level: entity.level,
            score: entity.score,
            shrapnel: entity.shrapnel,
            effects: entity.effects.clone(),
            recoil: entity.recoil.clone(),
            name: entity.name.clone(),
        }
    }
}

/// Cosmetic particle state, replicated best-effort
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub lifetime: f32,
    pub size: f32,
    pub hue: f32,
}

impl ParticleSnapshot {
    pub fn from_particle(p: &Particle) -> Self {
        Self {
            position: p.position,
            velocity: p.velocity,
            lifetime: p.lifetime,
            size: p.size,
            hue: p.hue,
        }
    }
}

/// Full authoritative world state at one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    /// Host wall-clock milliseconds, used by buffered interpolation
    pub timestamp_ms: u64,
    pub entities: Vec<EntitySnapshot>,
    pub particles: Vec<ParticleSnapshot>,
}

/// Encode a message with the legacy fixed-width bincode layout
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message with the legacy fixed-width bincode layout
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{StatusKind, StatusEffect};

    #[test]
    fn test_keys_direction_normalized() {
        let frame = InputFrame {
            keys: KeySet {
                up: true,
                right: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let d = frame.direction();
        assert!((d.length() - 1.0).abs() < 1e-5);
        assert!(d.x > 0.0 && d.y < 0.0);
    }

    #[test]
    fn test_joystick_overrides_keys_and_is_clamped() {
        let frame = InputFrame {
            keys: KeySet {
                left: true,
                ..Default::default()
            },
            joystick: Some(Vec2::new(3.0, 0.0)),
            ..Default::default()
        };
        let d = frame.direction();
        assert!((d.x - 1.0).abs() < 1e-5);
        assert_eq!(d.y, 0.0);
    }

    #[test]
    fn test_partial_joystick_deflection_preserved() {
        let frame = InputFrame {
            joystick: Some(Vec2::new(0.3, 0.0)),
            ..Default::default()
        };
        assert!((frame.direction().x - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_client_packet_input_round_trip() {
        let packet = ClientPacket::Input(InputFrame {
            sequence: 42,
            keys: KeySet {
                up: true,
                ..Default::default()
            },
            joystick: None,
            cursor: Vec2::new(100.0, -50.0),
            aim: 1.25,
            fire: true,
            skill: false,
        });
        let decoded: ClientPacket = decode(&encode(&packet).unwrap()).unwrap();
        match decoded {
            ClientPacket::Input(frame) => {
                assert_eq!(frame.sequence, 42);
                assert!(frame.keys.up);
                assert!(frame.fire);
                assert_eq!(frame.cursor, Vec2::new(100.0, -50.0));
            }
            _ => panic!("wrong packet type"),
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut effects = SmallVec::new();
        effects.push(StatusEffect::new(StatusKind::Burn, 2.0, 1.5));
        let mut recoil: SmallVec<[f32; 4]> = SmallVec::new();
        recoil.push(0.12);

        let snapshot = WorldSnapshot {
            tick: 900,
            timestamp_ms: 123_456,
            entities: vec![EntitySnapshot {
                id: 7,
                kind: EntityKind::Player,
                position: Vec2::new(10.0, 20.0),
                velocity: Vec2::new(-1.0, 0.5),
                rotation: 0.7,
                radius: 21.5,
                health: 80.0,
                max_health: 100.0,
                team: 1,
                owner: None,
                weapon: Some(3),
                damage: 0.0,
                lifetime: None,
                extent: None,
                level: 4,
                score: 120,
                shrapnel: false,
                effects,
                recoil,
                name: "Nia".to_string(),
            }],
            particles: vec![ParticleSnapshot {
                position: Vec2::ZERO,
                velocity: Vec2::new(5.0, 5.0),
                lifetime: 0.4,
                size: 2.0,
                hue: 0.6,
            }],
        };

        let msg = HostPacket::Snapshot(snapshot);
        let decoded: HostPacket = decode(&encode(&msg).unwrap()).unwrap();
        match decoded {
            HostPacket::Snapshot(s) => {
                assert_eq!(s.tick, 900);
                assert_eq!(s.entities.len(), 1);
                let e = &s.entities[0];
                assert_eq!(e.id, 7);
                assert_eq!(e.weapon, Some(3));
                assert_eq!(e.effects.len(), 1);
                assert_eq!(e.recoil.as_slice(), &[0.12]);
                assert_eq!(e.name, "Nia");
                assert_eq!(s.particles.len(), 1);
            }
            _ => panic!("wrong packet type"),
        }
    }

    #[test]
    fn test_invalid_decode() {
        let garbage = vec![0xFF, 0xFE, 0xFD];
        let result: Result<ClientPacket, _> = decode(&garbage);
        assert!(result.is_err());
    }
}
