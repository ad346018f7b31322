//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ChatConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ChatConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ChatConfig, ConfigError> {
    let config: ChatConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 50000);
        assert_eq!(config.server.shift, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 6000
            shift = 5

            [observability]
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.shift, Some(5));
        assert_eq!(config.server.max_connections, 1024);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.client.connect_timeout_secs, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config("[server]\nshift = 40\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e == &[ValidationError::ShiftOutOfRange(40)]));
        assert!(err.to_string().contains("server.shift"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(parse_config("[server\nport = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("chatroom-config-that-does-not-exist.toml");
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("chatroom-config-{}.toml", std::process::id()));
        fs::write(&path, "[client]\nhost = \"chat.local\"\nport = 7000\n").unwrap();

        let config = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.client.host, "chat.local");
        assert_eq!(config.client.port, 7000);
    }
}
