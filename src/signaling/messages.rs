use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::types::{ConnId, OutboundMessage, RoomCode};

/// Errors decoding an inbound frame
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("frame is not an event array")]
    NotAnEvent,

    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

/// The three handshake messages relayed peer to peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
}

impl RelayKind {
    pub fn event_name(self) -> &'static str {
        match self {
            RelayKind::Offer => "offer",
            RelayKind::Answer => "answer",
            RelayKind::IceCandidate => "ice-candidate",
        }
    }

    fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "offer" => Some(RelayKind::Offer),
            "answer" => Some(RelayKind::Answer),
            "ice-candidate" => Some(RelayKind::IceCandidate),
            _ => None,
        }
    }
}

/// Events sent from client to server.
///
/// Frames are JSON arrays: `["event-name", arg, ...]`. Arguments are kept
/// as the client sent them; validation happens in the router.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// `["create-room"]`
    CreateRoom,

    /// `["join-room", roomId]`
    JoinRoom { room_id: Option<String> },

    /// `["offer" | "answer" | "ice-candidate", payload, roomId, targetId]`
    Relay {
        kind: RelayKind,
        payload: Value,
        room_id: Option<String>,
        target: Option<String>,
    },
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let frame: Vec<Value> = serde_json::from_str(text)?;
        let mut args = frame.into_iter();

        let name = match args.next() {
            Some(Value::String(name)) => name,
            _ => return Err(ProtocolError::NotAnEvent),
        };

        match name.as_str() {
            "create-room" => Ok(ClientEvent::CreateRoom),
            "join-room" => Ok(ClientEvent::JoinRoom {
                room_id: string_arg(args.next()),
            }),
            other => match RelayKind::from_event_name(other) {
                Some(kind) => Ok(ClientEvent::Relay {
                    kind,
                    payload: args.next().unwrap_or(Value::Null),
                    room_id: string_arg(args.next()),
                    target: string_arg(args.next()),
                }),
                None => Err(ProtocolError::UnknownEvent(name)),
            },
        }
    }
}

fn string_arg(arg: Option<Value>) -> Option<String> {
    match arg {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Events sent from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// First frame on every connection: the client's own id
    Connected { id: ConnId },

    RoomCreated { room_id: RoomCode },

    UserJoined { conn_id: ConnId },

    RoomNotFound,

    /// Relayed handshake payload, tagged with the sender
    Relay {
        kind: RelayKind,
        payload: Value,
        from: ConnId,
    },

    HostDisconnected,
}

impl ServerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::RoomCreated { .. } => "room-created",
            ServerEvent::UserJoined { .. } => "user-joined",
            ServerEvent::RoomNotFound => "room-not-found",
            ServerEvent::Relay { kind, .. } => kind.event_name(),
            ServerEvent::HostDisconnected => "host-disconnected",
        }
    }

    pub fn to_message(&self) -> Result<OutboundMessage, serde_json::Error> {
        serde_json::to_string(self).map(OutboundMessage::from)
    }
}

impl Serialize for ServerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = match self {
            ServerEvent::RoomNotFound | ServerEvent::HostDisconnected => 1,
            ServerEvent::Connected { .. }
            | ServerEvent::RoomCreated { .. }
            | ServerEvent::UserJoined { .. } => 2,
            ServerEvent::Relay { .. } => 3,
        };

        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(self.event_name())?;
        match self {
            ServerEvent::Connected { id } => seq.serialize_element(id)?,
            ServerEvent::RoomCreated { room_id } => seq.serialize_element(room_id)?,
            ServerEvent::UserJoined { conn_id } => seq.serialize_element(conn_id)?,
            ServerEvent::Relay { payload, from, .. } => {
                seq.serialize_element(payload)?;
                seq.serialize_element(from)?;
            }
            ServerEvent::RoomNotFound | ServerEvent::HostDisconnected => {}
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_create_room() {
        let msg = ClientEvent::parse(r#"["create-room"]"#).unwrap();
        assert_eq!(msg, ClientEvent::CreateRoom);
    }

    #[test]
    fn parse_join_room() {
        let msg = ClientEvent::parse(r#"["join-room", "x7k2q"]"#).unwrap();
        assert_eq!(
            msg,
            ClientEvent::JoinRoom {
                room_id: Some("x7k2q".to_string())
            }
        );
    }

    #[test]
    fn parse_join_room_without_string_id() {
        let msg = ClientEvent::parse(r#"["join-room", 42]"#).unwrap();
        assert_eq!(msg, ClientEvent::JoinRoom { room_id: None });

        let msg = ClientEvent::parse(r#"["join-room"]"#).unwrap();
        assert_eq!(msg, ClientEvent::JoinRoom { room_id: None });
    }

    #[test]
    fn parse_offer_keeps_payload_verbatim() {
        let text = r#"["offer", {"type": "offer", "sdp": "v=0\r\n"}, "x7k2q", "Target123"]"#;
        let msg = ClientEvent::parse(text).unwrap();
        assert_eq!(
            msg,
            ClientEvent::Relay {
                kind: RelayKind::Offer,
                payload: json!({"type": "offer", "sdp": "v=0\r\n"}),
                room_id: Some("x7k2q".to_string()),
                target: Some("Target123".to_string()),
            }
        );
    }

    #[test]
    fn parse_ice_candidate_with_missing_args() {
        let msg = ClientEvent::parse(r#"["ice-candidate"]"#).unwrap();
        assert_eq!(
            msg,
            ClientEvent::Relay {
                kind: RelayKind::IceCandidate,
                payload: Value::Null,
                room_id: None,
                target: None,
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_event() {
        let err = ClientEvent::parse(r#"["leave-room", "x7k2q"]"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownEvent(name) if name == "leave-room"));
    }

    #[test]
    fn parse_rejects_non_event_frames() {
        assert!(matches!(
            ClientEvent::parse(r#"{"type": "create-room"}"#),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(
            ClientEvent::parse("[]"),
            Err(ProtocolError::NotAnEvent)
        ));
        assert!(matches!(
            ClientEvent::parse("[1, 2]"),
            Err(ProtocolError::NotAnEvent)
        ));
        assert!(matches!(
            ClientEvent::parse("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
    }

    #[test]
    fn serialize_room_created() {
        let msg = ServerEvent::RoomCreated {
            room_id: RoomCode::parse("x7k2q").unwrap(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"["room-created","x7k2q"]"#);
    }

    #[test]
    fn serialize_payloadless_events() {
        assert_eq!(
            serde_json::to_string(&ServerEvent::RoomNotFound).unwrap(),
            r#"["room-not-found"]"#
        );
        assert_eq!(
            serde_json::to_string(&ServerEvent::HostDisconnected).unwrap(),
            r#"["host-disconnected"]"#
        );
    }

    #[test]
    fn serialize_relay_appends_sender() {
        let msg = ServerEvent::Relay {
            kind: RelayKind::IceCandidate,
            payload: json!({"candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54400 typ host"}),
            from: ConnId::parse("Sender01").unwrap(),
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!([
                "ice-candidate",
                {"candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54400 typ host"},
                "Sender01"
            ])
        );
    }

    #[test]
    fn serialize_user_joined_and_connected() {
        let id = ConnId::parse("Joiner42").unwrap();
        assert_eq!(
            serde_json::to_string(&ServerEvent::UserJoined { conn_id: id }).unwrap(),
            r#"["user-joined","Joiner42"]"#
        );
        assert_eq!(
            serde_json::to_string(&ServerEvent::Connected { id }).unwrap(),
            r#"["connected","Joiner42"]"#
        );
    }
}
