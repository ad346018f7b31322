//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Apply the configured level unless `RUST_LOG` says otherwise

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber, writing to stdout.
///
/// `default_directive` is used when `RUST_LOG` is unset, e.g. `"chatroom=info"`.
pub fn init_logging(default_directive: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Same as [`init_logging`] but writes to stderr and drops the target column,
/// so log lines do not mix with an interactive terminal on stdout.
pub fn init_logging_stderr(default_directive: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Directive for this crate at `level`, e.g. `crate_directive("debug")`.
pub fn crate_directive(level: &str) -> String {
    format!("chatroom={}", level)
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into())
}
