use regex::Regex;
use tracing::{debug, warn};

use crate::config::{ConfigError, RelayConfig};

const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "https://localhost:5173",
    "https://localhost:3000",
    "http://sender.rajb.tech",
    "https://sender.rajb.tech",
];

const DEFAULT_ORIGIN_PATTERNS: &[&str] = &[
    r"\.rajb\.tech$",
    r"\.netlify\.app$",
    r"\.vercel\.app$",
    r"\.coolify\.app$",
    r"localhost:\d+$",
];

/// Cross-origin allow-list checked on every WebSocket upgrade.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    exact: Vec<String>,
    patterns: Vec<Regex>,
}

impl OriginPolicy {
    /// Built-in defaults plus the configured frontend and extras.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        let exact = DEFAULT_ORIGINS
            .iter()
            .map(|o| o.to_string())
            .chain(std::iter::once(config.frontend_url.clone()))
            .chain(config.extra_origins.iter().cloned())
            .collect();

        let patterns = DEFAULT_ORIGIN_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(config.extra_origin_patterns.iter().cloned())
            .map(|pattern| {
                Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern { pattern, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { exact, patterns })
    }

    /// `None` means the request carried no `Origin` header (native clients).
    pub fn allows(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };

        let allowed = self.exact.iter().any(|o| o == origin)
            || self.patterns.iter().any(|p| p.is_match(origin));

        if allowed {
            debug!("Origin allowed: {}", origin);
        } else {
            warn!("Origin blocked: {}", origin);
        }
        allowed
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self {
            exact: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            patterns: DEFAULT_ORIGIN_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }
}
