//! Input resolution, acceleration, and camera framing
//!
//! Movement uses an exponential friction model, NOT additive drag:
//! `velocity = velocity * FRICTION + accel * (1 - FRICTION)`
//! so a constant input converges on `accel` as the top speed.

use rand::Rng;

use crate::catalog::SkillKind;
use crate::net::protocol::InputFrame;
use crate::sim::constants::{camera, entity as entity_consts, movement, skills, status};
use crate::sim::context::SimContext;
use crate::sim::entity::{Entity, EntityKind, StatusKind};
use crate::util::vec2::{lerp_angle, Vec2};

/// Resolve inputs into acceleration for every player-controlled entity
pub fn update(ctx: &mut SimContext, _dt: f32) {
    for e in ctx.entities.iter_mut() {
        if e.kind != EntityKind::Player || !e.is_alive() {
            continue;
        }
        let Some(input) = ctx.inputs.get(&e.id) else {
            continue;
        };
        steer(e, input);
    }
}

/// One tick of input-driven steering for a single entity. Also used by
/// client-side prediction, which steers only the locally-owned entity.
pub(crate) fn steer(e: &mut Entity, input: &InputFrame) {
    // Turret mode roots the entity
    if e.has_active_skill(SkillKind::Turret) {
        e.velocity *= movement::FRICTION;
        e.rotation = lerp_angle(e.rotation, input.aim, movement::ROTATION_LERP);
        return;
    }

    let direction = input.direction();

    // Larger bodies are proportionally slower
    let mass_scale = (entity_consts::BASE_RADIUS / e.radius)
        .clamp(movement::SPEED_MIN_MULTIPLIER, movement::SPEED_MAX_MULTIPLIER);

    let mut speed = movement::BASE_SPEED * mass_scale;
    if e.has_active_skill(SkillKind::Overdrive) {
        speed *= skills::OVERDRIVE_SPEED_SCALE;
    }
    speed *= status_speed_scale(e);

    // Steady state of this recurrence is exactly `accel`
    let accel = direction * speed;
    e.velocity = e.velocity * movement::FRICTION + accel * (1.0 - movement::FRICTION);

    shock_jitter(e);

    // Rotation is always smoothed, never snapped
    e.rotation = lerp_angle(e.rotation, input.aim, movement::ROTATION_LERP);
}

/// Velocity multiplier from active slow effects. Every moving entity runs
/// through this, AI and drones included.
pub(crate) fn status_speed_scale(e: &Entity) -> f32 {
    let mut scale = 1.0;
    for effect in &e.effects {
        match effect.kind {
            StatusKind::Freeze => scale *= status::FREEZE_SLOW,
            StatusKind::Shock => scale *= status::SHOCK_SLOW,
            _ => {}
        }
    }
    scale
}

/// Positional twitch while shocked
pub(crate) fn shock_jitter(e: &mut Entity) {
    if e.effects.iter().any(|s| s.kind == StatusKind::Shock) {
        let mut rng = rand::thread_rng();
        e.position += Vec2::new(
            rng.gen_range(-status::SHOCK_JITTER..=status::SHOCK_JITTER),
            rng.gen_range(-status::SHOCK_JITTER..=status::SHOCK_JITTER),
        );
    }
}

/// The locally-controlled camera
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec2,
    pub zoom: f32,
    /// Decaying shake magnitude, bumped by explosions and heavy impacts
    pub shake: f32,
    /// Current shake jitter, added to `position` by the renderer
    pub offset: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            shake: 0.0,
            offset: Vec2::ZERO,
        }
    }
}

impl Camera {
    pub fn add_shake(&mut self, magnitude: f32) {
        self.shake = (self.shake + magnitude).min(30.0);
    }
}

/// Follow the local player with aim-biased look-ahead and speed/size zoom
pub fn update_camera(ctx: &mut SimContext, _dt: f32) {
    let Some(local_id) = ctx.local_player else {
        return;
    };
    let Some(player) = ctx.entities.get(local_id) else {
        return;
    };
    let Some(input) = ctx.inputs.get(&local_id) else {
        return;
    };

    // Bias toward the aim point so the player sees where they shoot
    let target = player.position + (input.cursor - player.position) * camera::LOOK_AHEAD;

    let speed = player.velocity.length();
    let zoom_target = (1.0 - (player.radius - entity_consts::BASE_RADIUS) * camera::ZOOM_PER_RADIUS
        + speed * camera::ZOOM_PER_SPEED)
        .clamp(camera::ZOOM_MIN, camera::ZOOM_MAX);

    let cam = &mut ctx.camera;
    cam.position = cam.position.lerp(target, camera::SMOOTHING);
    cam.zoom += (zoom_target - cam.zoom) * camera::SMOOTHING;

    cam.shake *= camera::SHAKE_DECAY;
    if cam.shake < 0.05 {
        cam.shake = 0.0;
        cam.offset = Vec2::ZERO;
    } else {
        let mut rng = rand::thread_rng();
        cam.offset = Vec2::new(
            rng.gen_range(-1.0..=1.0) * cam.shake,
            rng.gen_range(-1.0..=1.0) * cam.shake,
        );
    }
}
