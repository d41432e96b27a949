//! Session roles and host election
//!
//! Every process runs the same simulation; one peer per room is the host
//! and owns authority. Joining is optimistic: try to connect as a client,
//! and if the room has no host, wait a randomized backoff and try again
//! before claiming the host role. The randomized wait keeps two peers that
//! start simultaneously from both self-electing most of the time; if both
//! still claim, the hub rejects the second and it falls back to client.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::net::protocol::{self, ClientPacket, HostPacket, InputFrame};
use crate::net::sync::{self, SnapshotStrategy};
use crate::net::transport::{ClientLink, HostEvent, HostLink, MemoryHub, PeerId, TransportError};
use crate::sim::constants::net as net_consts;
use crate::sim::context::SimContext;
use crate::sim::entity::EntityId;
use crate::sim::events::ChatLine;
use crate::sim::systems::movement;
use crate::util::vec2::Vec2;

/// Milliseconds since the Unix epoch, used to stamp snapshots
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offline,
    Host,
    Client,
}

struct PeerState {
    entity: EntityId,
    name: String,
    last_sequence: u64,
}

/// Authoritative end of a room
pub struct HostSession {
    link: HostLink,
    peers: HashMap<PeerId, PeerState>,
}

impl HostSession {
    pub fn new(link: HostLink) -> Self {
        Self {
            link,
            peers: HashMap::new(),
        }
    }

    pub fn room(&self) -> &str {
        self.link.room()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Pump the network, advance one tick, and broadcast on cadence
    pub fn step(&mut self, ctx: &mut SimContext, dt: f32, now_ms: u64) {
        for event in self.link.poll_events() {
            match event {
                HostEvent::Joined { peer, name } => {
                    let spawn = random_spawn(ctx.arena_half);
                    match ctx.spawn_player(&name, spawn, next_team(ctx)) {
                        Some(entity) => {
                            info!(%peer, name, entity, "peer joined");
                            self.peers.insert(
                                peer,
                                PeerState {
                                    entity,
                                    name,
                                    last_sequence: 0,
                                },
                            );
                            let welcome = HostPacket::Welcome {
                                entity_id: entity,
                                tick: ctx.tick,
                            };
                            if let Ok(bytes) = protocol::encode(&welcome) {
                                let _ = self.link.send_to(peer, &bytes);
                            }
                        }
                        None => warn!(%peer, "entity pool full, join denied"),
                    }
                }
                HostEvent::Left { peer } => {
                    if let Some(state) = self.peers.remove(&peer) {
                        info!(%peer, name = state.name, "peer left");
                        ctx.inputs.remove(&state.entity);
                        if let Some(index) = ctx.entities.index_of(state.entity) {
                            ctx.entities.release(index);
                        }
                    }
                }
            }
        }

        for (peer, bytes) in self.link.poll_data() {
            let packet: ClientPacket = match protocol::decode(&bytes) {
                Ok(p) => p,
                Err(e) => {
                    debug!(%peer, "dropping undecodable packet: {e}");
                    continue;
                }
            };
            let Some(state) = self.peers.get_mut(&peer) else {
                continue;
            };
            match packet {
                ClientPacket::Input(frame) => {
                    // Latest sequence wins; stale or duplicate frames drop
                    if frame.sequence >= state.last_sequence {
                        state.last_sequence = frame.sequence;
                        ctx.inputs.insert(state.entity, frame);
                    }
                }
                ClientPacket::Chat { text } => {
                    let line = ChatLine {
                        sender: state.name.clone(),
                        text,
                    };
                    ctx.chat_log.push(line.clone());
                    if let Ok(bytes) = protocol::encode(&HostPacket::Chat {
                        sender: line.sender,
                        text: line.text,
                    }) {
                        self.link.broadcast(&bytes);
                    }
                }
                ClientPacket::Join { name } => {
                    if let Some(e) = ctx.entities.get_mut(state.entity) {
                        e.name = name.clone();
                    }
                    state.name = name;
                }
                ClientPacket::Leave => {
                    ctx.inputs.remove(&state.entity);
                }
            }
        }

        ctx.step(dt);

        if ctx.tick % net_consts::SNAPSHOT_INTERVAL_TICKS == 0 {
            let snapshot = sync::capture(ctx, now_ms);
            if let Ok(bytes) = protocol::encode(&HostPacket::Snapshot(snapshot)) {
                self.link.broadcast(&bytes);
            }
        }
    }
}

/// Predicting end of a room connection
pub struct ClientSession {
    link: ClientLink,
    strategy: Box<dyn SnapshotStrategy + Send>,
    pub entity: Option<EntityId>,
    sequence: u64,
    /// Most recent input sent to the host, replayed locally for prediction
    last_input: InputFrame,
    smooth: f32,
    reconcile_dist_sq: f32,
}

impl ClientSession {
    pub fn new(link: ClientLink, strategy: Box<dyn SnapshotStrategy + Send>) -> Self {
        Self {
            link,
            strategy,
            entity: None,
            sequence: 0,
            last_input: InputFrame::default(),
            smooth: net_consts::REMOTE_LERP,
            reconcile_dist_sq: net_consts::RECONCILE_DIST_SQ,
        }
    }

    pub fn peer(&self) -> PeerId {
        self.link.peer()
    }

    /// Stamp and send this tick's input
    pub fn send_input(&mut self, mut frame: InputFrame) -> Result<(), TransportError> {
        self.sequence += 1;
        frame.sequence = self.sequence;
        self.last_input = frame.clone();
        let bytes = protocol::encode(&ClientPacket::Input(frame))
            .map_err(|_| TransportError::Disconnected)?;
        self.link.send(&bytes)
    }

    pub fn send_chat(&self, text: &str) -> Result<(), TransportError> {
        let bytes = protocol::encode(&ClientPacket::Chat {
            text: text.to_string(),
        })
        .map_err(|_| TransportError::Disconnected)?;
        self.link.send(&bytes)
    }

    /// Pump the network, predict one tick, then fold in authority
    pub fn step(&mut self, ctx: &mut SimContext, dt: f32, now_ms: u64) {
        for bytes in self.link.drain() {
            let packet: HostPacket = match protocol::decode(&bytes) {
                Ok(p) => p,
                Err(e) => {
                    debug!("dropping undecodable packet: {e}");
                    continue;
                }
            };
            match packet {
                HostPacket::Welcome { entity_id, tick } => {
                    debug!(entity_id, tick, "welcomed into room");
                    self.entity = Some(entity_id);
                    ctx.local_player = Some(entity_id);
                }
                HostPacket::Snapshot(snapshot) => self.strategy.ingest(snapshot),
                HostPacket::Chat { sender, text } => {
                    ctx.chat_log.push(ChatLine { sender, text });
                }
            }
        }

        // No authoritative simulation on this side: predict only the
        // locally-owned entity, everything else comes from snapshots
        ctx.tick += 1;
        ctx.time += dt as f64;
        if let Some(id) = self.entity {
            ctx.inputs.insert(id, self.last_input.clone());
            let half = ctx.arena_half;
            if let Some(e) = ctx.entities.get_mut(id) {
                if e.is_alive() {
                    movement::steer(e, &self.last_input);
                    e.position += e.velocity * dt;
                    e.position.x = e.position.x.clamp(-half.x, half.x);
                    e.position.y = e.position.y.clamp(-half.y, half.y);
                }
            }
        }

        if let Some(snapshot) = self.strategy.sample(now_ms) {
            sync::apply_snapshot(
                ctx,
                &snapshot,
                self.entity,
                self.smooth,
                self.reconcile_dist_sq,
            );
        }

        ctx.particles.update(dt);
        movement::update_camera(ctx, dt);
    }
}

/// An established session in one of the three roles
pub enum Session {
    Offline,
    Host(HostSession),
    Client(ClientSession),
}

impl Session {
    pub fn role(&self) -> Role {
        match self {
            Session::Offline => Role::Offline,
            Session::Host(_) => Role::Host,
            Session::Client(_) => Role::Client,
        }
    }
}

fn random_spawn(arena_half: Vec2) -> Vec2 {
    let mut rng = rand::thread_rng();
    Vec2::new(
        rng.gen_range(-arena_half.x * 0.5..=arena_half.x * 0.5),
        rng.gen_range(-arena_half.y * 0.5..=arena_half.y * 0.5),
    )
}

fn next_team(ctx: &SimContext) -> u8 {
    // Every player on their own team; 0 stays reserved for neutrals
    (ctx.entities
        .iter()
        .filter(|e| e.kind == crate::sim::entity::EntityKind::Player)
        .count() as u8)
        .wrapping_add(1)
}

/// Join a room, electing ourselves host if nobody answers within the
/// election window.
pub fn establish(
    hub: &MemoryHub,
    room: &str,
    name: &str,
    strategy: Box<dyn SnapshotStrategy + Send>,
) -> Result<Session, TransportError> {
    let deadline = Instant::now()
        + Duration::from_millis(net_consts::ELECTION_TIMEOUT_MS);
    let mut name = name.to_string();
    let mut attempt = 1u32;

    loop {
        match hub.connect(room, &name) {
            Ok(link) => {
                info!(room, name, "joined as client");
                let session = ClientSession::new(link, strategy);
                let _ = session.send_chat_join(&name);
                return Ok(Session::Client(session));
            }
            Err(TransportError::NameTaken(_)) => {
                attempt += 1;
                name = format!("{}-{}", name, attempt);
                debug!(room, name, "name collision, retrying with suffix");
            }
            Err(TransportError::NoHost(_)) => {
                if Instant::now() >= deadline {
                    match hub.host(room) {
                        Ok(link) => {
                            info!(room, "elected self as host");
                            return Ok(Session::Host(HostSession::new(link)));
                        }
                        // Lost the election race; the winner hosts for us
                        Err(TransportError::HostExists(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                let backoff = rand::thread_rng().gen_range(
                    net_consts::ELECTION_BACKOFF_MIN_MS..=net_consts::ELECTION_BACKOFF_MAX_MS,
                );
                std::thread::sleep(Duration::from_millis(backoff));
            }
            Err(e) => return Err(e),
        }
    }
}

impl ClientSession {
    fn send_chat_join(&self, name: &str) -> Result<(), TransportError> {
        let bytes = protocol::encode(&ClientPacket::Join {
            name: name.to_string(),
        })
        .map_err(|_| TransportError::Disconnected)?;
        self.link.send(&bytes)
    }
}
