/// Simulation and session configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Room id to join or host
    pub room: String,
    /// Display name for the local player
    pub player_name: String,
    /// Half-extents of the arena in world units
    pub arena_half_extent: f32,
    /// Food pellets scattered at arena generation
    pub food_count: usize,
    /// Walls scattered at arena generation
    pub wall_count: usize,
    /// Practice targets spawned at startup
    pub dummy_count: usize,
    /// AI opponents spawned at startup
    pub enemy_count: usize,
    /// Use buffered interpolation instead of latest-snapshot sampling
    pub buffered_interp: bool,
    /// Render delay for buffered interpolation, in milliseconds
    pub interp_delay_ms: u64,
    /// Simulated datagram loss in [0, 1)
    pub loss: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            room: "arena".to_string(),
            player_name: "pilot".to_string(),
            arena_half_extent: 4000.0,
            food_count: 120,
            wall_count: 14,
            dummy_count: 2,
            enemy_count: 6,
            buffered_interp: false,
            interp_delay_ms: crate::sim::constants::net::INTERP_DELAY_MS,
            loss: 0.0,
        }
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(room) = std::env::var("ROOM") {
            if !room.is_empty() {
                config.room = room;
            } else {
                tracing::warn!("ROOM is empty, using default");
            }
        }

        if let Ok(name) = std::env::var("PLAYER_NAME") {
            if !name.is_empty() {
                config.player_name = name;
            } else {
                tracing::warn!("PLAYER_NAME is empty, using default");
            }
        }

        if let Ok(extent) = std::env::var("ARENA_HALF_EXTENT") {
            if let Ok(parsed) = extent.parse::<f32>() {
                if parsed >= 500.0 && parsed <= 50_000.0 {
                    config.arena_half_extent = parsed;
                } else {
                    tracing::warn!("ARENA_HALF_EXTENT must be 500-50000, using default");
                }
            } else {
                tracing::warn!("Invalid ARENA_HALF_EXTENT '{}', using default", extent);
            }
        }

        if let Ok(count) = std::env::var("FOOD_COUNT") {
            if let Ok(parsed) = count.parse::<usize>() {
                config.food_count = parsed;
            } else {
                tracing::warn!("Invalid FOOD_COUNT '{}', using default", count);
            }
        }

        if let Ok(count) = std::env::var("WALL_COUNT") {
            if let Ok(parsed) = count.parse::<usize>() {
                config.wall_count = parsed;
            } else {
                tracing::warn!("Invalid WALL_COUNT '{}', using default", count);
            }
        }

        if let Ok(count) = std::env::var("DUMMY_COUNT") {
            if let Ok(parsed) = count.parse::<usize>() {
                config.dummy_count = parsed;
            } else {
                tracing::warn!("Invalid DUMMY_COUNT '{}', using default", count);
            }
        }

        if let Ok(count) = std::env::var("ENEMY_COUNT") {
            if let Ok(parsed) = count.parse::<usize>() {
                config.enemy_count = parsed;
            } else {
                tracing::warn!("Invalid ENEMY_COUNT '{}', using default", count);
            }
        }

        if let Ok(flag) = std::env::var("BUFFERED_INTERP") {
            match flag.as_str() {
                "1" | "true" => config.buffered_interp = true,
                "0" | "false" => config.buffered_interp = false,
                other => tracing::warn!("Invalid BUFFERED_INTERP '{}', using default", other),
            }
        }

        if let Ok(delay) = std::env::var("INTERP_DELAY_MS") {
            if let Ok(parsed) = delay.parse::<u64>() {
                if parsed <= 1000 {
                    config.interp_delay_ms = parsed;
                } else {
                    tracing::warn!("INTERP_DELAY_MS must be <= 1000, using default");
                }
            } else {
                tracing::warn!("Invalid INTERP_DELAY_MS '{}', using default", delay);
            }
        }

        if let Ok(loss) = std::env::var("LOSS") {
            if let Ok(parsed) = loss.parse::<f32>() {
                if (0.0..1.0).contains(&parsed) {
                    config.loss = parsed;
                } else {
                    tracing::warn!("LOSS must be in [0, 1), using default");
                }
            } else {
                tracing::warn!("Invalid LOSS '{}', using default", loss);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.room.is_empty() {
            return Err("room cannot be empty".to_string());
        }
        if self.player_name.is_empty() {
            return Err("player_name cannot be empty".to_string());
        }
        if !self.arena_half_extent.is_finite() || self.arena_half_extent <= 0.0 {
            return Err("arena_half_extent must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.loss) {
            return Err("loss must be in [0, 1)".to_string());
        }
        Ok(())
    }
}
