use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::SignalingHandle;
use super::endpoints;
use super::messages::ClientEvent;
use super::origin::OriginPolicy;
use super::types::{ConnId, OutboundMessage};
use crate::config::{ConfigError, DEFAULT_MAX_MESSAGE_SIZE, RelayConfig};

pub const DEFAULT_SIGNALING_PORT: u16 = 3001;
pub const PING_INTERVAL: Duration = Duration::from_secs(25);
pub const PONG_TIMEOUT: Duration = Duration::from_secs(20);

/// Per-connection transport settings
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub origins: OriginPolicy,
    pub max_message_size: usize,
    /// Time between server pings
    pub ping_interval: Duration,
    /// How long a ping may go unanswered before the connection is dropped
    pub pong_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            origins: OriginPolicy::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            ping_interval: PING_INTERVAL,
            pong_timeout: PONG_TIMEOUT,
        }
    }
}

impl ServerOptions {
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            origins: OriginPolicy::from_config(config)?,
            max_message_size: config.max_message_size,
            ping_interval: config.ping_interval,
            pong_timeout: config.pong_timeout,
        })
    }

    fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_message_size))
    }
}

pub struct SignalingServer {
    listener: TcpListener,
    handle: SignalingHandle,
    options: Arc<ServerOptions>,
}

impl SignalingServer {
    /// Bind the listener and start the registry actor.
    pub async fn bind(addr: &str, options: ServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signaling server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handle: SignalingHandle::spawn(),
            options: Arc::new(options),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> SignalingHandle {
        self.handle.clone()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let options = self.options.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, options).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

fn check_origin(
    policy: &OriginPolicy,
    req: &Request,
    resp: Response,
) -> Result<Response, ErrorResponse> {
    // A non-UTF-8 header counts as present but unmatched.
    let origin = req
        .headers()
        .get("origin")
        .map(|v| v.to_str().unwrap_or(""));

    if policy.allows(origin) {
        return Ok(resp);
    }

    let mut refusal = ErrorResponse::new(Some("Not allowed by CORS".to_string()));
    *refusal.status_mut() = StatusCode::FORBIDDEN;
    Err(refusal)
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: SignalingHandle,
    options: Arc<ServerOptions>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let head = endpoints::peek_head(&stream).await?;
    if let Some(request) = endpoints::route(&head) {
        debug!("HTTP {:?} request from {}", request.endpoint, addr);
        return endpoints::respond(stream, request, &handle, &options.origins).await;
    }

    let policy = options.clone();
    let ws_stream = tokio_tungstenite::accept_hdr_async_with_config(
        stream,
        move |req: &Request, resp: Response| check_origin(&policy.origins, req, resp),
        Some(options.ws_config()),
    )
    .await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let conn: ConnId = handle.connect(tx).await?;
    info!("WebSocket connection {} from {}", conn, addr);

    let mut ping_interval = tokio::time::interval(options.ping_interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", conn);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + options.pong_timeout);
                debug!("Ping sent to {}", conn);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", conn);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", conn, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => match ClientEvent::parse(&text) {
                        Ok(event) => handle.dispatch(conn, event).await,
                        Err(e) => warn!("Dropping frame from {}: {}", conn, e),
                    },
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", conn);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", conn);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(conn).await;

    send_task.abort();
    info!("WebSocket disconnected: {}", conn);

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio_tungstenite::tungstenite::http::HeaderValue;

    use super::*;

    fn upgrade_request(origin: Option<&'static str>) -> Request {
        let mut req = Request::new(());
        if let Some(origin) = origin {
            req.headers_mut()
                .insert("origin", HeaderValue::from_static(origin));
        }
        req
    }

    #[test]
    fn upgrade_without_origin_is_accepted() {
        let policy = OriginPolicy::default();
        assert!(check_origin(&policy, &upgrade_request(None), Response::new(())).is_ok());
    }

    #[test]
    fn upgrade_from_allowed_origin_is_accepted() {
        let policy = OriginPolicy::default();
        let req = upgrade_request(Some("https://demo.vercel.app"));
        assert!(check_origin(&policy, &req, Response::new(())).is_ok());
    }

    #[test]
    fn upgrade_from_unknown_origin_is_forbidden() {
        let policy = OriginPolicy::default();
        let req = upgrade_request(Some("https://evil.example.org"));
        let refusal = check_origin(&policy, &req, Response::new(())).unwrap_err();
        assert_eq!(refusal.status(), StatusCode::FORBIDDEN);
        assert_eq!(refusal.body().as_deref(), Some("Not allowed by CORS"));
    }

    #[test]
    fn ws_config_applies_message_limit() {
        let options = ServerOptions {
            max_message_size: 4096,
            ..ServerOptions::default()
        };
        let config = options.ws_config();
        assert_eq!(config.max_message_size, Some(4096));
        assert_eq!(config.max_frame_size, Some(4096));
    }

    #[test]
    fn heartbeat_follows_config() {
        let config = RelayConfig {
            ping_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(3),
            ..RelayConfig::default()
        };
        let options = ServerOptions::from_config(&config).unwrap();
        assert_eq!(options.ping_interval, Duration::from_secs(5));
        assert_eq!(options.pong_timeout, Duration::from_secs(3));

        let defaults = ServerOptions::default();
        assert_eq!(defaults.ping_interval, PING_INTERVAL);
        assert_eq!(defaults.pong_timeout, PONG_TIMEOUT);
    }
}
