use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::types::{ConnId, RoomCode};

/// A live signaling session. The host never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room {
    pub host: ConnId,
}

/// In-memory room table, the sole owner of room lifecycle.
///
/// Not synchronised: the registry actor owns the only instance and applies
/// one command at a time.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room hosted by `host` under a fresh code.
    pub fn create(&mut self, host: ConnId) -> RoomCode {
        self.create_with(host, RoomCode::generate)
    }

    /// Draws codes from `generate` until one is free; a live room is never overwritten.
    pub(crate) fn create_with(
        &mut self,
        host: ConnId,
        mut generate: impl FnMut() -> RoomCode,
    ) -> RoomCode {
        loop {
            let code = generate();
            if let Entry::Vacant(slot) = self.rooms.entry(code) {
                slot.insert(Room { host });
                return code;
            }
        }
    }

    pub fn lookup(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Remove every room hosted by `conn`, returning their codes.
    pub fn remove_if_host(&mut self, conn: ConnId) -> Vec<RoomCode> {
        let mut removed = Vec::new();
        self.rooms.retain(|code, room| {
            if room.host == conn {
                removed.push(*code);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
