//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server and client subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout/stderr through the fmt layer
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Relayed plaintext is logged for the operator at info level
//! - Metrics are cheap and become no-ops when no exporter is installed
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;
