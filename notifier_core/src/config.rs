/**
 * Engine configuration.
 *
 * Built once at startup and shared read-only (behind an `Arc`) with every
 * send. Nothing in the engine mutates it afterwards, so the default timeout
 * and relay settings are plain values rather than process globals.
 *
 * A JSON form is accepted for deployments that keep settings in a file:
 *
 * ```json
 * {
 *   "default_timeout_ms": 5000,
 *   "relay": { "host": "relay.local", "port": 9000 },
 *   "max_message_size": 8388608
 * }
 * ```
 *
 * Missing keys take the defaults documented on `EngineConfig`.
 */
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound for a notification round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default cap on headers + body of one outgoing notification.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

/// Default cap on the captured raw response.
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 8 * 1024 * 1024;

/// Default number of idle handles kept per destination.
pub const DEFAULT_MAX_IDLE_PER_DESTINATION: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Address of the notification relay. Empty host or zero port disables it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl RelayConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timeout used when a request asks for the default. `None` = unbounded.
    pub default_timeout: Option<Duration>,

    /// Relay used by requests that opt in. `None` disables relaying.
    pub relay: Option<RelayConfig>,

    /// Maximum header + body bytes of one outgoing notification.
    pub max_message_size: usize,

    /// Maximum bytes captured from one response.
    pub max_response_size: u64,

    /// Idle handles kept per destination; extras are dropped on release.
    pub max_idle_per_destination: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(DEFAULT_TIMEOUT),
            relay: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            max_idle_per_destination: DEFAULT_MAX_IDLE_PER_DESTINATION,
        }
    }
}

/// On-disk shape. Timeout is in milliseconds, 0 meaning "no timeout".
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    default_timeout_ms: u64,
    relay: Option<RelayConfig>,
    max_message_size: usize,
    max_response_size: u64,
    max_idle_per_destination: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            relay: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            max_idle_per_destination: DEFAULT_MAX_IDLE_PER_DESTINATION,
        }
    }
}

impl From<RawConfig> for EngineConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            default_timeout: match raw.default_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            relay: raw.relay.filter(RelayConfig::is_configured),
            max_message_size: raw.max_message_size,
            max_response_size: raw.max_response_size,
            max_idle_per_destination: raw.max_idle_per_destination,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        Ok(raw.into())
    }

    /// The relay, only if it is usable.
    pub fn active_relay(&self) -> Option<&RelayConfig> {
        self.relay.as_ref().filter(|relay| relay.is_configured())
    }

    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.relay = Some(RelayConfig {
            host: host.into(),
            port,
        });
        self
    }
}
