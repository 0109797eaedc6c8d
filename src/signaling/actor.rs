use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::lifecycle;
use super::messages::ClientEvent;
use super::registry::{Room, RoomRegistry};
use super::router;
use super::transport::Hub;
use super::types::{ConnId, OutboundMessage, RoomCode, SignalingError};

/// Commands sent to the registry actor
pub(crate) enum RoomCommand {
    Connect {
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<ConnId>,
    },
    Event {
        conn: ConnId,
        event: ClientEvent,
    },
    Disconnect {
        conn: ConnId,
    },
    Lookup {
        code: RoomCode,
        reply: oneshot::Sender<Option<Room>>,
    },
    Stats {
        reply: oneshot::Sender<RegistryStats>,
    },
}

/// Snapshot of live state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct RegistryStats {
    pub rooms: usize,
    pub connections: usize,
}

/// Owns the room registry and the hub; applies one command at a time so no
/// handler ever observes a partial update.
pub(crate) async fn room_manager_actor(mut rx: mpsc::Receiver<RoomCommand>) {
    let mut registry = RoomRegistry::new();
    let mut hub = Hub::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RoomCommand::Connect { peer_tx, reply } => {
                let conn = hub.register(peer_tx);
                info!("Connection {} registered", conn);
                let _ = reply.send(conn);
            }

            RoomCommand::Event { conn, event } => {
                if hub.is_connected(conn) {
                    router::dispatch(&mut registry, &mut hub, conn, event);
                }
            }

            RoomCommand::Disconnect { conn } => {
                if hub.unregister(conn) {
                    let vacated = lifecycle::handle_disconnect(&mut registry, &mut hub, conn);
                    info!(
                        "Connection {} removed ({} room(s) closed, {} live)",
                        conn,
                        vacated.len(),
                        registry.len()
                    );
                }
            }

            RoomCommand::Lookup { code, reply } => {
                let _ = reply.send(registry.lookup(&code).copied());
            }

            RoomCommand::Stats { reply } => {
                let _ = reply.send(RegistryStats {
                    rooms: registry.len(),
                    connections: hub.connection_count(),
                });
            }
        }
    }
}

/// Handle to communicate with the registry actor
#[derive(Clone)]
pub struct SignalingHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

impl SignalingHandle {
    /// Spawn the actor on the current runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<RoomCommand>(1024);
        tokio::spawn(room_manager_actor(rx));
        Self { tx }
    }

    /// Register a connection; its first outbound message is its own id.
    pub async fn connect(
        &self,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<ConnId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(RoomCommand::Connect {
                peer_tx,
                reply: reply_tx,
            })
            .await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    /// Hand a decoded client event to the router
    pub async fn dispatch(&self, conn: ConnId, event: ClientEvent) {
        let _ = self.tx.send(RoomCommand::Event { conn, event }).await;
    }

    /// Drop the connection and close any rooms it hosted
    pub async fn disconnect(&self, conn: ConnId) {
        let _ = self.tx.send(RoomCommand::Disconnect { conn }).await;
    }

    pub async fn lookup_room(&self, code: RoomCode) -> Result<Option<Room>, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(RoomCommand::Lookup {
                code,
                reply: reply_tx,
            })
            .await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    pub async fn stats(&self) -> Result<RegistryStats, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.tx.send(RoomCommand::Stats { reply: reply_tx }).await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }
}
