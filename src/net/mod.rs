//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (split into shared write handle + single-owner reader)
//!     → codec.rs (newline-delimited ASCII frames)
//!     → Hand off to the relay layer
//!
//! Connection States:
//!     Open → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - A message is one line; the framing never coalesces two messages
//! - Closing is the only cancellation primitive: it drops the write half
//!   and wakes the reader

pub mod codec;
pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionError, ConnectionHandle, ConnectionReader, ConnectionState, Received};
pub use listener::{ConnectionPermit, Listener, ListenerError};
