use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::messages::ServerEvent;
use super::types::{ConnId, OutboundMessage, RoomCode};

/// Delivery capabilities the signaling core relies on.
pub trait Transport {
    /// Unicast to one connection. Unknown targets are dropped.
    fn emit(&self, to: ConnId, event: &ServerEvent);

    /// Add `conn` to the group named `room`. Idempotent.
    fn join(&mut self, conn: ConnId, room: RoomCode);

    /// Multicast to every current member of `room`, optionally skipping one.
    fn broadcast(&self, room: RoomCode, event: &ServerEvent, except: Option<ConnId>);

    /// Dissolve the group named `room`; its members leave it.
    fn disband(&mut self, room: RoomCode);
}

#[derive(Debug)]
struct PeerState {
    /// Channel for outbound messages to this peer.
    /// Uses OutboundMessage (Arc-backed bytes) for O(1) broadcast cloning.
    tx: mpsc::UnboundedSender<OutboundMessage>,
    rooms: HashSet<RoomCode>,
}

/// Live connections and their room groups.
#[derive(Debug, Default)]
pub struct Hub {
    peers: HashMap<ConnId, PeerState>,
    groups: HashMap<RoomCode, HashSet<ConnId>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection under a fresh id and greet it with that id.
    pub fn register(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> ConnId {
        let mut id = ConnId::generate();
        while self.peers.contains_key(&id) {
            id = ConnId::generate();
        }

        self.peers.insert(
            id,
            PeerState {
                tx,
                rooms: HashSet::new(),
            },
        );
        self.emit(id, &ServerEvent::Connected { id });
        id
    }

    /// Drop a connection and its group memberships. Returns false if unknown.
    pub fn unregister(&mut self, conn: ConnId) -> bool {
        let Some(peer) = self.peers.remove(&conn) else {
            return false;
        };

        for room in peer.rooms {
            if let Some(members) = self.groups.get_mut(&room) {
                members.remove(&conn);
                if members.is_empty() {
                    self.groups.remove(&room);
                }
            }
        }
        true
    }

    pub fn is_connected(&self, conn: ConnId) -> bool {
        self.peers.contains_key(&conn)
    }

    pub fn members(&self, room: RoomCode) -> Vec<ConnId> {
        self.groups
            .get(&room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, conn: ConnId) -> Vec<RoomCode> {
        self.peers
            .get(&conn)
            .map(|peer| peer.rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }
}

fn encode(event: &ServerEvent) -> Option<OutboundMessage> {
    match event.to_message() {
        Ok(msg) => Some(msg),
        Err(e) => {
            error!("Failed to encode {} event: {}", event.event_name(), e);
            None
        }
    }
}

impl Transport for Hub {
    fn emit(&self, to: ConnId, event: &ServerEvent) {
        let Some(peer) = self.peers.get(&to) else {
            debug!("Dropping {} for unknown connection {}", event.event_name(), to);
            return;
        };
        if let Some(msg) = encode(event) {
            let _ = peer.tx.send(msg);
        }
    }

    fn join(&mut self, conn: ConnId, room: RoomCode) {
        let Some(peer) = self.peers.get_mut(&conn) else {
            return;
        };
        peer.rooms.insert(room);
        self.groups.entry(room).or_default().insert(conn);
    }

    fn broadcast(&self, room: RoomCode, event: &ServerEvent, except: Option<ConnId>) {
        let Some(members) = self.groups.get(&room) else {
            return;
        };
        let Some(msg) = encode(event) else {
            return;
        };

        for member in members.iter().filter(|m| Some(**m) != except) {
            if let Some(peer) = self.peers.get(member) {
                let _ = peer.tx.send(msg.clone());
            }
        }
    }

    fn disband(&mut self, room: RoomCode) {
        let Some(members) = self.groups.remove(&room) else {
            return;
        };
        for member in members {
            if let Some(peer) = self.peers.get_mut(&member) {
                peer.rooms.remove(&room);
            }
        }
    }
}
