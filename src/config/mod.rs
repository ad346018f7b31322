//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ChatConfig (validated, immutable)
//!     → CLI flags override individual fields
//!     → cloned into the server or client at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the shift key in particular never
//!   changes for the lifetime of a server
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ChatConfig, ClientConfig, ObservabilityConfig, ProtocolConfig, ServerConfig, DEFAULT_PORT};
pub use validation::{validate_config, ValidationError};
