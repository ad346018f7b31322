//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the chatroom.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cipher::{ShiftKey, ShiftKeyError};

/// Default TCP port for both server and client.
pub const DEFAULT_PORT: u16 = 50000;

/// Root configuration for server and client binaries.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChatConfig {
    /// Relay server settings.
    pub server: ServerConfig,

    /// Client session settings.
    pub client: ClientConfig,

    /// Wire protocol limits shared by both sides.
    pub protocol: ProtocolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Relay server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Port to listen on. 0 picks a free port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Upper bound for one broadcast write to one recipient, in milliseconds.
    pub write_timeout_ms: u64,

    /// Pin the shift key instead of drawing a random one.
    pub shift: Option<u8>,
}

impl ServerConfig {
    /// The key for this server run: the pinned value, or a fresh random one.
    pub fn shift_key(&self) -> Result<ShiftKey, ShiftKeyError> {
        match self.shift {
            Some(0) => Err(ShiftKeyError::OutOfRange(0)),
            Some(value) => ShiftKey::new(value),
            None => Ok(ShiftKey::random()),
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: 1024,
            write_timeout_ms: 5000,
            shift: None,
        }
    }
}

/// Client session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host to connect to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Bound on connection establishment and key receipt, in seconds.
    pub connect_timeout_secs: u64,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_secs: 5,
        }
    }
}

/// Limits of the line protocol.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Largest message accepted or sent, excluding the line terminator.
    pub max_message_bytes: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
