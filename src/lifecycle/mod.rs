//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger → accept loop stops → registry closes every connection
//!             → each relay loop sees Closed and deregisters
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl+C) or operator "q" on stdin → trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown is a broadcast: any number of tasks can wait on it
//! - Stopping the network is separate from exiting the process; binaries
//!   decide when to exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{console_lines, wait_for_quit_command, wait_for_stop_request, StopRequest};
