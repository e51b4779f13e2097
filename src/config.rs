//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `DICED_*`
//! environment variables. CLI flags are applied on top by the binary.
//! The roll delay is not part of any layer; it stays at [`ROLL_DELAY`].

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::sessions::{DEFAULT_IDLE_TIMEOUT, ROLL_DELAY};

/// Default cap on concurrently live sessions
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DICED_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_sessions: usize,
    /// Seconds an unobserved session may sit untouched; 0 keeps sessions forever
    pub idle_timeout_secs: u64,
    /// Delay between a roll starting and resolving
    ///
    /// Never read from files or the environment. Only code embedding the
    /// server (tests) may change it.
    #[serde(skip)]
    pub roll_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
            roll_delay_ms: ROLL_DELAY.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }

    pub fn roll_delay(&self) -> Duration {
        Duration::from_millis(self.roll_delay_ms)
    }

    /// Idle expiry, if enabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// How often to look for idle sessions
    pub fn reap_interval(&self) -> Option<Duration> {
        self.idle_timeout()
            .map(|timeout| (timeout / 4).max(Duration::from_secs(1)))
    }
}
