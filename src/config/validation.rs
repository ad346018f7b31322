//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, shift within the key range)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ChatConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::cipher::key::MAX_SHIFT;
use crate::config::schema::ChatConfig;

pub const MIN_MESSAGE_BYTES: usize = 64;
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("server.shift must be within 1..=26, got {0}")]
    ShiftOutOfRange(u8),

    #[error("protocol.max_message_bytes must be within 64..=65536, got {0}")]
    MessageSize(usize),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &ChatConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "server.bind_address" });
    }
    if config.server.max_connections == 0 {
        errors.push(ValidationError::Zero { field: "server.max_connections" });
    }
    if config.server.write_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "server.write_timeout_ms" });
    }
    if let Some(shift) = config.server.shift {
        if shift == 0 || shift > MAX_SHIFT {
            errors.push(ValidationError::ShiftOutOfRange(shift));
        }
    }

    if config.client.host.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "client.host" });
    }
    if config.client.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "client.connect_timeout_secs" });
    }

    let size = config.protocol.max_message_bytes;
    if !(MIN_MESSAGE_BYTES..=MAX_MESSAGE_BYTES).contains(&size) {
        errors.push(ValidationError::MessageSize(size));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
