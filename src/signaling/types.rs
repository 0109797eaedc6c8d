use std::fmt;

use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Signaling server errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("internal error: {0}")]
    Internal(String),
}

const ROOM_CODE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const CONN_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ROOM_CODE_LEN: usize = 6;
const CONN_ID_LEN: usize = 20;

/// Inline ASCII token of at most `N` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Token<const N: usize> {
    bytes: [u8; N],
    len: u8,
}

impl<const N: usize> Token<N> {
    fn generate(alphabet: &[u8]) -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; N];
        for byte in &mut bytes {
            *byte = alphabet[rng.random_range(0..alphabet.len())];
        }
        Self {
            bytes,
            len: N as u8,
        }
    }

    /// Never truncates: input longer than `N` or outside `[A-Za-z0-9]` is rejected.
    fn parse(s: &str) -> Option<Self> {
        let src = s.as_bytes();
        if src.is_empty() || src.len() > N || !src.iter().all(u8::is_ascii_alphanumeric) {
            return None;
        }
        let mut bytes = [0u8; N];
        bytes[..src.len()].copy_from_slice(src);
        Some(Self {
            bytes,
            len: src.len() as u8,
        })
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

/// Room code: six lowercase alphanumerics, unique among live rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomCode(Token<ROOM_CODE_LEN>);

impl RoomCode {
    pub fn generate() -> Self {
        Self(Token::generate(ROOM_CODE_CHARS))
    }

    /// Parse a client-supplied room code.
    pub fn parse(s: &str) -> Option<Self> {
        Token::parse(s).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Connection id: 20 alphanumerics assigned by the hub on connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(Token<CONN_ID_LEN>);

impl ConnId {
    pub fn generate() -> Self {
        Self(Token::generate(CONN_ID_CHARS))
    }

    /// Parse a client-supplied connection id.
    pub fn parse(s: &str) -> Option<Self> {
        Token::parse(s).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

macro_rules! impl_token_traits {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                $ty::parse(&s).ok_or_else(|| D::Error::custom(concat!("invalid ", $what)))
            }
        }
    };
}

impl_token_traits!(RoomCode, "room code");
impl_token_traits!(ConnId, "connection id");

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}
