//! Broadcast relay subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs (accept)
//!     → registry.admit (shift key under the zero shift, then visible to broadcasts)
//!     → relay_loop.rs (one task per connection)
//!         receive → decode → log plaintext → encode
//!     → registry.broadcast_except (every other connection's write path)
//!
//! On read failure / end of stream:
//!     relay_loop closes its connection and removes it from the registry once
//! ```
//!
//! # Design Decisions
//! - The shift key is an immutable value copied into each task
//! - The registry is the only shared mutable state and is mutex-guarded
//! - Broadcast never deregisters; removal belongs to the failing connection's
//!   own relay loop

pub mod registry;
pub mod relay_loop;
pub mod server;

pub use registry::{BroadcastReport, ConnectionRegistry};
pub use relay_loop::{CloseReason, RelayLoop, RelayOutcome};
pub use server::{start_server, ChatServer, RunningServer, ServerError};
