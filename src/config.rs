//! Process configuration for the relay.
//!
//! Priority (highest first): CLI flags, environment variables, compiled
//! defaults.

use std::time::Duration;

use crate::signaling::{DEFAULT_SIGNALING_PORT, PING_INTERVAL, PONG_TIMEOUT};

/// Errors that can occur when turning configuration into runtime policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An allowed-origin pattern is not a valid regular expression.
    #[error("invalid origin pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// CLI arguments for the relay server.
#[derive(clap::Parser, Debug)]
#[command(version, about = "WebRTC signaling relay")]
pub struct CliArgs {
    /// Interface to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_SIGNALING_PORT)]
    pub port: u16,

    /// Origin of the deployed frontend; always allowed.
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:5173")]
    pub frontend_url: String,

    /// Additional exact origins to allow.
    #[arg(long = "allow-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allow_origins: Vec<String>,

    /// Additional origin regular expressions to allow.
    #[arg(
        long = "allow-origin-pattern",
        env = "ALLOWED_ORIGIN_PATTERNS",
        value_delimiter = ','
    )]
    pub allow_origin_patterns: Vec<String>,

    /// Largest accepted WebSocket message, in bytes.
    #[arg(long, env = "MAX_MESSAGE_SIZE", default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,

    /// Seconds between heartbeat pings.
    #[arg(long, env = "PING_INTERVAL_SECS", default_value_t = PING_INTERVAL.as_secs())]
    pub ping_interval_secs: u64,

    /// Seconds a ping may go unanswered before the connection is closed.
    #[arg(long, env = "PONG_TIMEOUT_SECS", default_value_t = PONG_TIMEOUT.as_secs())]
    pub pong_timeout_secs: u64,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1_000_000;

/// Fully resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind, e.g. `0.0.0.0:3001`.
    pub bind_addr: String,
    pub frontend_url: String,
    pub extra_origins: Vec<String>,
    pub extra_origin_patterns: Vec<String>,
    pub max_message_size: usize,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_SIGNALING_PORT),
            frontend_url: "http://localhost:5173".to_string(),
            extra_origins: Vec::new(),
            extra_origin_patterns: Vec::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            ping_interval: PING_INTERVAL,
            pong_timeout: PONG_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_args(cli: &CliArgs) -> Self {
        Self {
            bind_addr: format!("{}:{}", cli.host, cli.port),
            frontend_url: cli.frontend_url.clone(),
            extra_origins: non_empty(&cli.allow_origins),
            extra_origin_patterns: non_empty(&cli.allow_origin_patterns),
            max_message_size: cli.max_message_size,
            // A zero period would make the ping timer panic.
            ping_interval: Duration::from_secs(cli.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(cli.pong_timeout_secs),
            log_level: cli.log_level.clone(),
        }
    }
}

/// Empty env vars split into a single empty entry; drop those.
fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
