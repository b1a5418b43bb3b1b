//! Process configuration, read once at startup.
//!
//! The only external knob is `SERVER_PORT`. Everything else — the request
//! deadline, the cache sweep period and entry max age — is fixed policy:
//! with a 30 s sweep and a 60 s max age, a cold entry is reclaimed at most
//! ~90 s after its last access.

use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to bind. `SERVER_PORT` overrides the default.
    pub port: u16,
    /// Per-request execution deadline enforced by the timeout stage.
    pub deadline: Duration,
    /// Fixed period of the cache janitor.
    pub sweep_period: Duration,
    /// Sliding expiration age for cache entries.
    pub max_age: Duration,
}

impl Config {
    /// Reads `SERVER_PORT` from the environment. Absent or unparsable values
    /// fall back to the default, as the original service did.
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { port, ..Self::default() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            deadline: Duration::from_secs(60),
            sweep_period: Duration::from_secs(30),
            max_age: Duration::from_secs(60),
        }
    }
}
