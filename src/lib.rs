//! Signaling relay for WebRTC peers.
//!
//! Peers connect over WebSocket, create or join rooms, and exchange
//! offer/answer/ICE-candidate messages addressed to each other's
//! connection id. The relay never carries media.

pub mod config;
pub mod signaling;
