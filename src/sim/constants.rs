/// Tick timing - the whole pipeline runs once per tick, single-threaded
pub mod tick {
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 30;
    /// Delta time per tick in seconds
    pub const DT: f32 = 1.0 / 30.0;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
}

/// Movement constants - CRITICAL: friction is exponential (v *= FRICTION), not subtractive
pub mod movement {
    /// Per-tick velocity retention factor.
    /// Applied as: velocity = velocity * FRICTION + accel * (1 - FRICTION)
    pub const FRICTION: f32 = 0.90;
    /// Base top speed for a level-1 player (units/second)
    pub const BASE_SPEED: f32 = 260.0;
    /// Minimum speed multiplier for very large entities
    pub const SPEED_MIN_MULTIPLIER: f32 = 0.4;
    /// Maximum speed multiplier for very small entities
    pub const SPEED_MAX_MULTIPLIER: f32 = 1.6;
    /// Rotation smoothing factor per tick (angular lerp, never snapped)
    pub const ROTATION_LERP: f32 = 0.25;
}

/// Entity defaults and pool limits
pub mod entity {
    /// Global live-entity cap; spawn requests past this are silently dropped
    pub const MAX_LIVE: usize = 2048;
    /// Live-particle cap
    pub const MAX_PARTICLES: usize = 4096;
    /// Base body radius for a level-1 player
    pub const BASE_RADIUS: f32 = 20.0;
    /// Radius growth per level
    pub const RADIUS_PER_LEVEL: f32 = 1.5;
    /// Default player hit points
    pub const PLAYER_HEALTH: f32 = 100.0;
    /// Body-vs-body contact damage per tick when teams differ
    pub const CONTACT_DAMAGE: f32 = 0.5;
    /// Fraction of penetration depth corrected per tick (soft separation)
    pub const SEPARATION_FACTOR: f32 = 0.5;
}

/// Experience and leveling
pub mod level {
    /// XP required for the first level-up
    pub const XP_BASE: f32 = 100.0;
    /// Exponential growth of the level-up threshold
    pub const XP_GROWTH: f32 = 1.35;
    /// XP granted per point of max health of the victim
    pub const XP_PER_MAX_HEALTH: f32 = 0.5;
    /// Score granted per kill
    pub const SCORE_PER_KILL: u32 = 10;
}

/// Camera framing
pub mod camera {
    /// How far the camera leads toward the aim point (0 = centered on player)
    pub const LOOK_AHEAD: f32 = 0.22;
    /// Zoom bounds
    pub const ZOOM_MIN: f32 = 0.55;
    pub const ZOOM_MAX: f32 = 1.25;
    /// Exponential smoothing factor for position and zoom per tick
    pub const SMOOTHING: f32 = 0.12;
    /// Shake magnitude decay factor per tick
    pub const SHAKE_DECAY: f32 = 0.88;
    /// Zoom shrink per unit of entity radius above base
    pub const ZOOM_PER_RADIUS: f32 = 0.004;
    /// Zoom growth per unit of speed
    pub const ZOOM_PER_SPEED: f32 = 0.0004;
}

/// AI steering
pub mod ai {
    /// Default target acquisition radius
    pub const ACQUIRE_RADIUS: f32 = 550.0;
    /// Acquisition radius multiplier against a stealthed target
    pub const STEALTH_ACQUIRE_SCALE: f32 = 0.35;
    /// Radius of the short-range separation force
    pub const SEPARATION_RADIUS: f32 = 70.0;
    /// Separation force strength (acceleration units)
    pub const SEPARATION_FORCE: f32 = 180.0;
    /// AI acceleration toward its target
    pub const SEEK_ACCEL: f32 = 190.0;
    /// AI rotation smoothing per tick
    pub const FACE_LERP: f32 = 0.15;
    /// Firing range as a fraction of weapon range
    pub const FIRE_RANGE_SCALE: f32 = 0.9;
}

/// Weapon firing
pub mod weapons {
    /// Hard cap on shrapnel projectiles from one detonation
    pub const SHRAPNEL_MAX: usize = 8;
    /// Shrapnel speed relative to the parent weapon's projectile speed
    pub const SHRAPNEL_SPEED_SCALE: f32 = 0.6;
    /// Shrapnel damage relative to the parent weapon's damage
    pub const SHRAPNEL_DAMAGE_SCALE: f32 = 0.35;
    /// Area damage radius for explosive payloads
    pub const EXPLOSION_RADIUS: f32 = 120.0;
    /// Bullet radius growth per owner level
    pub const BULLET_SIZE_PER_LEVEL: f32 = 0.35;
    /// Knockback applied to the shooter per shot, scaled by weapon recoil
    pub const RECOIL_IMPULSE: f32 = 40.0;
    /// Default projectile lifetime in seconds
    pub const PROJECTILE_LIFETIME: f32 = 2.5;
    /// Trap lifetime in seconds
    pub const TRAP_LIFETIME: f32 = 12.0;
    /// Hard cap on cone-spray wave lifetime in seconds
    pub const WAVE_LIFETIME: f32 = 0.5;
}

/// Skill tuning
pub mod skills {
    /// Speed multiplier while overdrive is active
    pub const OVERDRIVE_SPEED_SCALE: f32 = 1.45;
    /// Reload multiplier while overdrive is active
    pub const OVERDRIVE_RELOAD_SCALE: f32 = 0.6;
    /// Instant velocity added along the aim direction on dash
    pub const DASH_IMPULSE: f32 = 520.0;
    /// Incoming damage multiplier while the shield is up
    pub const SHIELD_DAMAGE_SCALE: f32 = 0.35;
    /// Incoming damage multiplier while armor is active
    pub const ARMOR_DAMAGE_SCALE: f32 = 0.6;
    /// Fraction of blocked damage returned to the attacker by reflect
    pub const REFLECT_FRACTION: f32 = 0.5;
    /// Teleport distance along the aim direction
    pub const TELEPORT_RANGE: f32 = 240.0;
    /// EMP blast radius (strips enemy velocity and shocks)
    pub const EMP_RADIUS: f32 = 300.0;
    /// Gravity well pull radius and acceleration
    pub const GRAVITY_RADIUS: f32 = 260.0;
    pub const GRAVITY_PULL: f32 = 420.0;
    /// Fraction of damage dealt returned as health while lifesteal is active
    pub const LIFESTEAL_FRACTION: f32 = 0.25;
    /// Seconds between automatic beams for the interval-beam skill
    pub const INTERVAL_BEAM_PERIOD: f32 = 0.75;
    /// Chain lightning hop limit, search radius, and per-hop damage
    pub const CHAIN_TARGETS: usize = 4;
    pub const CHAIN_RADIUS: f32 = 220.0;
    pub const CHAIN_DAMAGE: f32 = 14.0;
    /// Turret mode: rooted, harder-hitting, faster-cycling
    pub const TURRET_DAMAGE_SCALE: f32 = 2.0;
    pub const TURRET_RELOAD_SCALE: f32 = 0.5;
}

/// Drone behavior
pub mod drones {
    /// Orbit ring radius around the owner
    pub const ORBIT_RADIUS: f32 = 80.0;
    /// Orbit angular speed (radians/second)
    pub const ORBIT_SPIN: f32 = 2.2;
    /// Spring acceleration toward the desired point
    pub const SPRING_ACCEL: f32 = 320.0;
    /// Repel mode flee distance from the aim point
    pub const REPEL_DISTANCE: f32 = 250.0;
    /// Drone hit points
    pub const HEALTH: f32 = 24.0;
    /// Drone body radius
    pub const RADIUS: f32 = 9.0;
}

/// Status effect tuning
pub mod status {
    /// Seconds between periodic burn/corrosion damage applications
    pub const DOT_INTERVAL: f32 = 0.5;
    /// Velocity scale while frozen
    pub const FREEZE_SLOW: f32 = 0.45;
    /// Velocity scale while shocked
    pub const SHOCK_SLOW: f32 = 0.7;
    /// Positional jitter magnitude while shocked
    pub const SHOCK_JITTER: f32 = 1.5;
}

/// World events (timed global modifiers)
pub mod world_event {
    /// Minimum seconds between world events
    pub const MIN_INTERVAL: f32 = 45.0;
    /// Maximum seconds between world events
    pub const MAX_INTERVAL: f32 = 120.0;
    /// World event duration in seconds
    pub const DURATION: f32 = 20.0;
    /// XP multiplier during a double-XP window
    pub const XP_MULTIPLIER: f32 = 2.0;
    /// Seconds between extra enemy spawns during a swarm
    pub const SWARM_SPAWN_INTERVAL: f32 = 2.5;
    /// Kill score multiplier during a bounty window
    pub const BOUNTY_SCORE_MULTIPLIER: u32 = 3;
}

/// Spatial hash grid
pub mod spatial {
    /// Cell size in world units (~2x max body radius)
    pub const CELL_SIZE: f32 = 64.0;
}

/// Network synchronization
pub mod net {
    /// Snapshots are broadcast every N ticks (30 Hz / 3 = 10 Hz)
    pub const SNAPSHOT_INTERVAL_TICKS: u64 = 3;
    /// Squared distance beyond which a predicted local entity is hard-snapped
    pub const RECONCILE_DIST_SQ: f32 = 200.0 * 200.0;
    /// Smoothing factor for other-owned entity interpolation
    pub const REMOTE_LERP: f32 = 0.35;
    /// Snapshots retained by the buffered interpolation strategy
    pub const SNAPSHOT_BUFFER: usize = 8;
    /// Render delay for buffered interpolation in milliseconds
    pub const INTERP_DELAY_MS: u64 = 100;
    /// How long a joining client waits for a host before self-electing
    pub const ELECTION_TIMEOUT_MS: u64 = 1500;
    /// Randomized backoff range before self-electing as host
    pub const ELECTION_BACKOFF_MIN_MS: u64 = 100;
    pub const ELECTION_BACKOFF_MAX_MS: u64 = 900;
    /// Entries retained in the kill feed and chat log
    pub const FEED_CAPACITY: usize = 32;
}
