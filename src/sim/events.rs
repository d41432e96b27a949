//! World events, sandbox signals, and outbound collaborator feeds
//!
//! These types form the simulation's edges: timed global modifiers, the
//! debug signal counters consumed once per increment, the fire-and-forget
//! audio cue queue, and the periodic UI snapshot.

use serde::{Deserialize, Serialize};

use crate::sim::constants::net::FEED_CAPACITY;
use crate::sim::constants::world_event;
use crate::util::vec2::Vec2;

/// Timed global modifier kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEventKind {
    /// All XP grants are multiplied while active
    DoubleXp,
    /// Extra enemies spawn on an interval while active
    Swarm,
    /// Kill score payouts are multiplied while active
    Bounty,
}

/// An active world event with its remaining duration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldEvent {
    pub kind: WorldEventKind,
    pub remaining: f32,
}

impl WorldEvent {
    pub fn start(kind: WorldEventKind) -> Self {
        Self {
            kind,
            remaining: world_event::DURATION,
        }
    }

    pub fn xp_multiplier(&self) -> f32 {
        match self.kind {
            WorldEventKind::DoubleXp => world_event::XP_MULTIPLIER,
            _ => 1.0,
        }
    }

    pub fn score_multiplier(&self) -> u32 {
        match self.kind {
            WorldEventKind::Bounty => world_event::BOUNTY_SCORE_MULTIPLIER,
            _ => 1,
        }
    }
}

/// Monotonic sandbox/debug signal counters
///
/// A collaborator bumps a counter to request the action; the simulation
/// compares against its `seen` copy each tick and executes the delta
/// exactly once. Repeating the same counter value is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxSignals {
    pub spawn_boss: u32,
    pub heal_player: u32,
    pub reset_level: u32,
    pub clear_enemies: u32,
    pub grant_level: u32,
    pub toggle_god: u32,
}

impl SandboxSignals {
    /// Counters incremented relative to the previously seen copy
    pub fn delta(&self, seen: &SandboxSignals) -> SandboxDelta {
        SandboxDelta {
            spawn_boss: self.spawn_boss.wrapping_sub(seen.spawn_boss),
            heal_player: self.heal_player.wrapping_sub(seen.heal_player),
            reset_level: self.reset_level.wrapping_sub(seen.reset_level),
            clear_enemies: self.clear_enemies.wrapping_sub(seen.clear_enemies),
            grant_level: self.grant_level.wrapping_sub(seen.grant_level),
            toggle_god: self.toggle_god.wrapping_sub(seen.toggle_god),
        }
    }
}

/// How many times each signal fired since last observed
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxDelta {
    pub spawn_boss: u32,
    pub heal_player: u32,
    pub reset_level: u32,
    pub clear_enemies: u32,
    pub grant_level: u32,
    pub toggle_god: u32,
}

impl SandboxDelta {
    pub fn is_empty(&self) -> bool {
        self.spawn_boss == 0
            && self.heal_player == 0
            && self.reset_level == 0
            && self.clear_enemies == 0
            && self.grant_level == 0
            && self.toggle_god == 0
    }
}

/// Fire-and-forget sound requests for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    Shot,
    Hit,
    Kill,
    Explosion,
    LevelUp,
    SkillReady,
}

/// One kill-feed line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillFeedEntry {
    pub killer: String,
    pub victim: String,
    pub tick: u64,
}

/// One chat line, relayed verbatim by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLine {
    pub sender: String,
    pub text: String,
}

/// Bounded feed that drops its oldest entry past capacity
#[derive(Debug, Clone)]
pub struct Feed<T> {
    entries: Vec<T>,
    cap: usize,
}

impl<T> Feed<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cap: FEED_CAPACITY,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() >= self.cap {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub level: u32,
}

/// Periodic snapshot for the stats/UI collaborator
///
/// Emitted on its own refresh interval, decoupled from the tick rate.
#[derive(Debug, Clone, Default)]
pub struct UiStats {
    pub score: u32,
    pub level: u32,
    pub xp: f32,
    pub xp_threshold: f32,
    pub position: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub skill_cooldown: f32,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Present while a boss entity is alive
    pub boss_health: Option<(f32, f32)>,
    pub kill_feed: Vec<KillFeedEntry>,
    pub chat_log: Vec<ChatLine>,
    pub world_event: Option<WorldEventKind>,
    pub live_entities: usize,
}
