//! Fixed-capacity object pools for entities and particles
//!
//! Live objects sit in a dense `Vec` iterated every tick; released objects
//! move to a free list and are recycled by the next acquire. Identity is
//! carried by a monotonic id counter, never by storage index, so a recycled
//! slot can never be mistaken for the entity that previously occupied it.

use crate::sim::constants::entity as entity_consts;
use crate::sim::entity::{Entity, EntityId, EntityTemplate};
use crate::util::vec2::Vec2;

/// Pool of simulated entities with a hard live cap
pub struct EntityPool {
    live: Vec<Entity>,
    free: Vec<Entity>,
    next_id: EntityId,
    cap: usize,
}

impl EntityPool {
    pub fn new(cap: usize) -> Self {
        Self {
            live: Vec::with_capacity(cap.min(256)),
            free: Vec::new(),
            next_id: 1,
            cap,
        }
    }

    /// Spawn an entity from the template. Returns `None` when the live cap
    /// is reached; callers treat that as a silent denial, not an error.
    pub fn acquire(&mut self, template: EntityTemplate) -> Option<EntityId> {
        let id = self.next_id;
        let spawned = self.acquire_with_id(id, template);
        if spawned.is_some() {
            self.next_id += 1;
        }
        spawned
    }

    /// Spawn with a caller-supplied id. Used when mirroring entities created
    /// by a remote authority so both sides agree on identity.
    pub fn acquire_with_id(
        &mut self,
        id: EntityId,
        template: EntityTemplate,
    ) -> Option<EntityId> {
        if self.live.len() >= self.cap {
            return None;
        }
        let mut entity = self.free.pop().unwrap_or_else(Entity::blank);
        entity.reset(id, template);
        self.live.push(entity);
        if id >= self.next_id {
            self.next_id = id + 1;
        }
        Some(id)
    }

    /// Release by live index. Swap-remove keeps iteration dense; callers
    /// must only release at defined points (never mid-iteration).
    pub fn release(&mut self, index: usize) {
        if index >= self.live.len() {
            return;
        }
        let mut entity = self.live.swap_remove(index);
        entity.clear_for_release();
        self.free.push(entity);
    }

    /// Release every live entity matching the predicate
    pub fn release_where<F: FnMut(&Entity) -> bool>(&mut self, mut pred: F) {
        let mut i = 0;
        while i < self.live.len() {
            if pred(&self.live[i]) {
                self.release(i);
            } else {
                i += 1;
            }
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.live.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.live.iter_mut().find(|e| e.id == id)
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.live.iter().position(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.live.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.live.iter_mut()
    }

    pub fn live(&self) -> &[Entity] {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut [Entity] {
        &mut self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Default for EntityPool {
    fn default() -> Self {
        Self::new(entity_consts::MAX_LIVE)
    }
}

/// Short-lived cosmetic particle. No collision, no network identity.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub lifetime: f32,
    pub size: f32,
    pub hue: f32,
}

/// Particle pool. Same discipline as `EntityPool` but without identity,
/// particles are fire-and-forget visuals.
pub struct ParticlePool {
    live: Vec<Particle>,
    cap: usize,
}

impl ParticlePool {
    pub fn new(cap: usize) -> Self {
        Self {
            live: Vec::with_capacity(cap.min(512)),
            cap,
        }
    }

    /// Spawn a particle, silently dropped at the cap
    pub fn spawn(&mut self, particle: Particle) {
        if self.live.len() < self.cap {
            self.live.push(particle);
        }
    }

    /// Integrate positions and retire expired particles
    pub fn update(&mut self, dt: f32) {
        let mut i = 0;
        while i < self.live.len() {
            let p = &mut self.live[i];
            p.lifetime -= dt;
            if p.lifetime <= 0.0 {
                self.live.swap_remove(i);
            } else {
                p.position += p.velocity * dt;
                p.velocity *= 0.92;
                i += 1;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.live.iter()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new(entity_consts::MAX_PARTICLES)
    }
}
