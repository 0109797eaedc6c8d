//! WebSocket signaling relay: room registry, event router and lifecycle handling

mod actor;
mod endpoints;
mod lifecycle;
mod messages;
mod origin;
mod registry;
mod router;
mod server;
mod transport;
mod types;

pub use actor::{RegistryStats, SignalingHandle};
pub use lifecycle::handle_disconnect;
pub use messages::{ClientEvent, ProtocolError, RelayKind, ServerEvent};
pub use origin::OriginPolicy;
pub use registry::{Room, RoomRegistry};
pub use router::dispatch;
pub use server::{
    DEFAULT_SIGNALING_PORT, PING_INTERVAL, PONG_TIMEOUT, ServerOptions, SignalingServer,
};
pub use transport::{Hub, Transport};
pub use types::{ConnId, OutboundMessage, RoomCode, SignalingError};
