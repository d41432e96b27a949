//! Peer transport
//!
//! The simulation core does not own a network stack; it talks to peers
//! through links handed out by a hub. `MemoryHub` is the in-process
//! implementation used for local sessions and tests: rooms keyed by id,
//! one host end per room, datagram semantics with optional simulated loss.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use hashbrown::HashMap;
use parking_lot::Mutex;
use rand::Rng;
use uuid::Uuid;

pub type PeerId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no host in room '{0}'")]
    NoHost(String),
    #[error("room '{0}' already has a host")]
    HostExists(String),
    #[error("name '{0}' already taken in this room")]
    NameTaken(String),
    #[error("peer disconnected")]
    Disconnected,
}

/// Connection lifecycle events delivered to the host
#[derive(Debug, Clone)]
pub enum HostEvent {
    Joined { peer: PeerId, name: String },
    Left { peer: PeerId },
}

struct RoomState {
    /// Queues toward the host
    events_tx: Sender<HostEvent>,
    data_tx: Sender<(PeerId, Vec<u8>)>,
    /// Per-client downstream queues
    clients: HashMap<PeerId, Sender<Vec<u8>>>,
    names: Vec<String>,
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<String, RoomState>,
}

/// In-process transport hub. Cheap to clone; all clones share rooms.
#[derive(Clone)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
    /// Simulated datagram loss in [0, 1)
    loss: f32,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            loss: 0.0,
        }
    }

    /// Hub that randomly drops the given fraction of datagrams
    pub fn with_loss(loss: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            loss: loss.clamp(0.0, 0.99),
        }
    }

    fn lossy_drop(&self) -> bool {
        self.loss > 0.0 && rand::thread_rng().gen::<f32>() < self.loss
    }

    /// Claim the host end of a room
    pub fn host(&self, room: &str) -> Result<HostLink, TransportError> {
        let mut state = self.state.lock();
        if state.rooms.contains_key(room) {
            return Err(TransportError::HostExists(room.to_string()));
        }
        let (events_tx, events_rx) = unbounded();
        let (data_tx, data_rx) = unbounded();
        state.rooms.insert(
            room.to_string(),
            RoomState {
                events_tx,
                data_tx,
                clients: HashMap::new(),
                names: Vec::new(),
            },
        );
        Ok(HostLink {
            hub: self.clone(),
            room: room.to_string(),
            events: events_rx,
            data: data_rx,
        })
    }

    /// Join a room as a client. Fails fast when no host is listening,
    /// which is what drives host election on the caller's side.
    pub fn connect(&self, room: &str, name: &str) -> Result<ClientLink, TransportError> {
        let mut state = self.state.lock();
        let room_state = state
            .rooms
            .get_mut(room)
            .ok_or_else(|| TransportError::NoHost(room.to_string()))?;
        if room_state.names.iter().any(|n| n == name) {
            return Err(TransportError::NameTaken(name.to_string()));
        }

        let peer = Uuid::new_v4();
        let (down_tx, down_rx) = unbounded();
        room_state.clients.insert(peer, down_tx);
        room_state.names.push(name.to_string());
        let _ = room_state.events_tx.send(HostEvent::Joined {
            peer,
            name: name.to_string(),
        });

        Ok(ClientLink {
            hub: self.clone(),
            room: room.to_string(),
            peer,
            up: room_state.data_tx.clone(),
            down: down_rx,
        })
    }

    /// Whether a room currently has a live host
    pub fn has_host(&self, room: &str) -> bool {
        self.state.lock().rooms.contains_key(room)
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Host end of a room
pub struct HostLink {
    hub: MemoryHub,
    room: String,
    events: Receiver<HostEvent>,
    data: Receiver<(PeerId, Vec<u8>)>,
}

impl HostLink {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Drain pending join/leave events
    pub fn poll_events(&self) -> Vec<HostEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Drain pending datagrams from all clients
    pub fn poll_data(&self) -> Vec<(PeerId, Vec<u8>)> {
        let mut out = Vec::new();
        while let Ok(item) = self.data.try_recv() {
            out.push(item);
        }
        out
    }

    pub fn send_to(&self, peer: PeerId, payload: &[u8]) -> Result<(), TransportError> {
        if self.hub.lossy_drop() {
            return Ok(());
        }
        let state = self.hub.state.lock();
        let room = state
            .rooms
            .get(&self.room)
            .ok_or(TransportError::Disconnected)?;
        let tx = room.clients.get(&peer).ok_or(TransportError::Disconnected)?;
        tx.send(payload.to_vec())
            .map_err(|_| TransportError::Disconnected)
    }

    /// Best-effort broadcast; unreachable peers are dropped from the room
    pub fn broadcast(&self, payload: &[u8]) {
        let mut gone: Vec<PeerId> = Vec::new();
        {
            let state = self.hub.state.lock();
            let Some(room) = state.rooms.get(&self.room) else {
                return;
            };
            for (peer, tx) in room.clients.iter() {
                if self.hub.lossy_drop() {
                    continue;
                }
                if tx.send(payload.to_vec()).is_err() {
                    gone.push(*peer);
                }
            }
        }
        if !gone.is_empty() {
            let mut state = self.hub.state.lock();
            if let Some(room) = state.rooms.get_mut(&self.room) {
                for peer in gone {
                    room.clients.remove(&peer);
                }
            }
        }
    }
}

impl Drop for HostLink {
    fn drop(&mut self) {
        self.hub.state.lock().rooms.remove(&self.room);
    }
}

/// Client end of a room connection
pub struct ClientLink {
    hub: MemoryHub,
    room: String,
    peer: PeerId,
    up: Sender<(PeerId, Vec<u8>)>,
    down: Receiver<Vec<u8>>,
}

impl ClientLink {
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.hub.lossy_drop() {
            return Ok(());
        }
        self.up
            .send((self.peer, payload.to_vec()))
            .map_err(|_| TransportError::Disconnected)
    }

    /// Non-blocking receive of the next datagram from the host
    pub fn try_recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.down.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Drain every pending datagram
    pub fn drain(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Ok(payload) = self.down.try_recv() {
            out.push(payload);
        }
        out
    }
}

impl Drop for ClientLink {
    fn drop(&mut self) {
        let mut state = self.hub.state.lock();
        if let Some(room) = state.rooms.get_mut(&self.room) {
            room.clients.remove(&self.peer);
            let _ = room.events_tx.send(HostEvent::Left { peer: self.peer });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_without_host_fails() {
        let hub = MemoryHub::new();
        match hub.connect("arena", "alice") {
            Err(TransportError::NoHost(room)) => assert_eq!(room, "arena"),
            other => panic!("expected NoHost, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_second_host_rejected() {
        let hub = MemoryHub::new();
        let _host = hub.host("arena").unwrap();
        assert!(matches!(
            hub.host("arena"),
            Err(TransportError::HostExists(_))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let hub = MemoryHub::new();
        let _host = hub.host("arena").unwrap();
        let _alice = hub.connect("arena", "alice").unwrap();
        assert!(matches!(
            hub.connect("arena", "alice"),
            Err(TransportError::NameTaken(_))
        ));
    }

    #[test]
    fn test_round_trip_datagrams() {
        let hub = MemoryHub::new();
        let host = hub.host("arena").unwrap();
        let client = hub.connect("arena", "alice").unwrap();

        let events = host.poll_events();
        assert!(matches!(events.as_slice(), [HostEvent::Joined { name, .. }] if name == "alice"));

        client.send(b"hello").unwrap();
        let data = host.poll_data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].0, client.peer());
        assert_eq!(data[0].1, b"hello");

        host.send_to(client.peer(), b"welcome").unwrap();
        assert_eq!(client.try_recv().unwrap(), Some(b"welcome".to_vec()));
        assert_eq!(client.try_recv().unwrap(), None);
    }

    #[test]
    fn test_broadcast_reaches_all_clients() {
        let hub = MemoryHub::new();
        let host = hub.host("arena").unwrap();
        let a = hub.connect("arena", "a").unwrap();
        let b = hub.connect("arena", "b").unwrap();

        host.broadcast(b"tick");
        assert_eq!(a.try_recv().unwrap(), Some(b"tick".to_vec()));
        assert_eq!(b.try_recv().unwrap(), Some(b"tick".to_vec()));
    }

    #[test]
    fn test_host_drop_frees_room() {
        let hub = MemoryHub::new();
        {
            let _host = hub.host("arena").unwrap();
            assert!(hub.has_host("arena"));
        }
        assert!(!hub.has_host("arena"));
        assert!(hub.host("arena").is_ok());
    }

    #[test]
    fn test_client_drop_notifies_host() {
        let hub = MemoryHub::new();
        let host = hub.host("arena").unwrap();
        let peer = {
            let client = hub.connect("arena", "alice").unwrap();
            client.peer()
        };
        let events = host.poll_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, HostEvent::Left { peer: p } if *p == peer)));
    }

    #[test]
    fn test_full_loss_drops_everything() {
        let hub = MemoryHub::with_loss(0.99);
        let host = hub.host("arena").unwrap();
        let client = hub.connect("arena", "alice").unwrap();

        let mut received = 0;
        for _ in 0..50 {
            host.send_to(client.peer(), b"x").unwrap();
        }
        while client.try_recv().unwrap().is_some() {
            received += 1;
        }
        assert!(received < 50, "loss should drop most datagrams");
    }
}
