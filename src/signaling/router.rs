use tracing::{debug, info};

use super::messages::{ClientEvent, RelayKind, ServerEvent};
use super::registry::RoomRegistry;
use super::transport::Transport;
use super::types::{ConnId, RoomCode};

/// Apply one client event from `from` to the registry and transport.
///
/// Never fails: unknown rooms are reported to the sender, misaddressed
/// relays are dropped.
pub fn dispatch<T: Transport>(
    registry: &mut RoomRegistry,
    transport: &mut T,
    from: ConnId,
    event: ClientEvent,
) {
    match event {
        ClientEvent::CreateRoom => create_room(registry, transport, from),
        ClientEvent::JoinRoom { room_id } => join_room(registry, transport, from, room_id),
        ClientEvent::Relay {
            kind,
            payload,
            room_id,
            target,
        } => relay(transport, from, kind, payload, room_id, target),
    }
}

fn create_room<T: Transport>(registry: &mut RoomRegistry, transport: &mut T, from: ConnId) {
    let room_id = registry.create(from);
    transport.join(from, room_id);
    info!("Room created: {} by {}", room_id, from);
    transport.emit(from, &ServerEvent::RoomCreated { room_id });
}

fn join_room<T: Transport>(
    registry: &RoomRegistry,
    transport: &mut T,
    from: ConnId,
    room_id: Option<String>,
) {
    let found = room_id
        .as_deref()
        .and_then(RoomCode::parse)
        .filter(|code| registry.lookup(code).is_some());

    match found {
        Some(code) => {
            transport.join(from, code);
            info!("{} joined room {}", from, code);
            transport.broadcast(code, &ServerEvent::UserJoined { conn_id: from }, Some(from));
        }
        None => {
            debug!("{} asked for unknown room {:?}", from, room_id);
            transport.emit(from, &ServerEvent::RoomNotFound);
        }
    }
}

fn relay<T: Transport>(
    transport: &T,
    from: ConnId,
    kind: RelayKind,
    payload: serde_json::Value,
    room_id: Option<String>,
    target: Option<String>,
) {
    let Some(to) = target.as_deref().and_then(ConnId::parse) else {
        debug!("Dropping {} from {}: no valid target", kind.event_name(), from);
        return;
    };
    // Relays address "everyone else"; a self-addressed relay reaches nobody.
    if to == from {
        debug!("Dropping self-addressed {} from {}", kind.event_name(), from);
        return;
    }

    debug!(
        "Relaying {} {} -> {} (room {:?})",
        kind.event_name(),
        from,
        to,
        room_id
    );
    transport.emit(to, &ServerEvent::Relay { kind, payload, from });
}
