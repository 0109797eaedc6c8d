//! Plain HTTP `GET /health` and `GET /test`, served on the signaling port.
//!
//! The request head is peeked before the WebSocket upgrade; anything that is
//! not one of these two routes (upgrades included) is left in the socket for
//! the handshake.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::info;

use super::actor::{RegistryStats, SignalingHandle};
use super::origin::OriginPolicy;

const MAX_HEAD: usize = 8192;
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);
const PEEK_RETRY: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Health,
    Test,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PlainRequest {
    pub endpoint: Endpoint,
    pub origin: Option<String>,
    /// Bytes up to and including the blank line
    pub head_len: usize,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    #[serde(flatten)]
    stats: RegistryStats,
}

#[derive(Serialize)]
struct TestBody {
    message: &'static str,
    origin: Option<String>,
    timestamp: String,
}

/// Peek at the start of the stream until a full request head is buffered,
/// the buffer fills, the peer stops sending or the deadline passes.
pub(crate) async fn peek_head(stream: &TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_HEAD];
    let deadline = tokio::time::Instant::now() + HEAD_TIMEOUT;

    loop {
        let n = match tokio::time::timeout_at(deadline, stream.peek(&mut buf)).await {
            Ok(result) => result?,
            Err(_) => return Ok(Vec::new()),
        };
        if n == 0 || n == buf.len() || find_head_end(&buf[..n]).is_some() {
            buf.truncate(n);
            return Ok(buf);
        }
        if tokio::time::Instant::now() >= deadline {
            buf.truncate(n);
            return Ok(buf);
        }
        tokio::time::sleep(PEEK_RETRY).await;
    }
}

fn find_head_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// `None` for upgrades, other methods or paths, and incomplete heads.
pub(crate) fn route(bytes: &[u8]) -> Option<PlainRequest> {
    let head_len = find_head_end(bytes)?;
    let head = std::str::from_utf8(&bytes[..head_len]).ok()?;

    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    if request_line.next()? != "GET" {
        return None;
    }
    let target = request_line.next()?;
    let path = target.split_once('?').map_or(target, |(path, _)| path);
    let endpoint = match path {
        "/health" => Endpoint::Health,
        "/test" => Endpoint::Test,
        _ => return None,
    };

    let mut origin = None;
    for line in lines.take_while(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("upgrade") && value.eq_ignore_ascii_case("websocket") {
            return None;
        }
        if name.eq_ignore_ascii_case("origin") {
            origin = Some(value.to_string());
        }
    }

    Some(PlainRequest {
        endpoint,
        origin,
        head_len,
    })
}

/// Consume the request, write a JSON response and close.
pub(crate) async fn respond(
    mut stream: TcpStream,
    request: PlainRequest,
    handle: &SignalingHandle,
    origins: &OriginPolicy,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut head = vec![0u8; request.head_len];
    stream.read_exact(&mut head).await?;

    let origin = request.origin.as_deref();
    let response = if !origins.allows(origin) {
        render("403 Forbidden", "text/plain", None, "Not allowed by CORS")
    } else {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = match request.endpoint {
            Endpoint::Health => serde_json::to_string(&HealthBody {
                status: "ok",
                timestamp,
                stats: handle.stats().await?,
            })?,
            Endpoint::Test => {
                info!("Test endpoint hit from origin: {:?}", origin);
                serde_json::to_string(&TestBody {
                    message: "CORS test successful",
                    origin: request.origin.clone(),
                    timestamp,
                })?
            }
        };
        render("200 OK", "application/json", origin, &body)
    };

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn render(status: &str, content_type: &str, allow_origin: Option<&str>, body: &str) -> String {
    let cors = allow_origin
        .map(|o| {
            format!("Access-Control-Allow-Origin: {o}\r\nAccess-Control-Allow-Credentials: true\r\n")
        })
        .unwrap_or_default();
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n{cors}Connection: close\r\n\r\n{body}",
        body.len()
    )
}
