use tracing::info;

use super::messages::ServerEvent;
use super::registry::RoomRegistry;
use super::transport::Transport;
use super::types::{ConnId, RoomCode};

/// Tear down every room hosted by `conn` and tell the remaining members.
///
/// Must run after the transport has dropped `conn` from its groups. A closed
/// room's group is dissolved so a later room reusing the code starts empty.
/// Rooms where `conn` was only a member are left untouched.
pub fn handle_disconnect<T: Transport>(
    registry: &mut RoomRegistry,
    transport: &mut T,
    conn: ConnId,
) -> Vec<RoomCode> {
    let vacated = registry.remove_if_host(conn);
    for room_id in &vacated {
        info!("Room {} closed: host {} disconnected", room_id, conn);
        transport.broadcast(*room_id, &ServerEvent::HostDisconnected, None);
        transport.disband(*room_id);
    }
    vacated
}
