//! Text chatroom: a broadcast relay server and its client session.
//!
//! # Architecture Overview
//!
//! ```text
//!   chat-client                          chatroom (server)
//!  ┌───────────────┐                   ┌──────────────────────────────────────────┐
//!  │ presentation  │                   │  net::listener (accept, max_connections) │
//!  │   ▲      │    │                   │        │                                 │
//!  │ sink   send   │    TCP, one line  │        ▼                                 │
//!  │   │      ▼    │    per message    │  registry.admit (shift key, zero shift)  │
//!  │ ClientSession │◀─────────────────▶│        │                                 │
//!  │  (receive task│                   │        ▼                                 │
//!  │   + send path)│                   │  relay_loop (one task per connection)    │
//!  └───────────────┘                   │   decode → log → encode                  │
//!                                      │        │                                 │
//!                                      │        ▼                                 │
//!                                      │  registry.broadcast_except(origin)       │
//!                                      └──────────────────────────────────────────┘
//! ```
//!
//! Every payload is run through the [`cipher`] shift transform. It is an
//! obfuscation step, not encryption.

// Core subsystems
pub mod cipher;
pub mod client;
pub mod net;
pub mod relay;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use cipher::ShiftKey;
pub use client::{start_client, ClientSession, MessageSink};
pub use config::ChatConfig;
pub use lifecycle::Shutdown;
pub use relay::{start_server, ChatServer, ConnectionRegistry, RunningServer};
