//! Client session subsystem.
//!
//! # Data Flow
//! ```text
//! presentation (terminal, GUI, tests)
//!     → session.send(text)      labelled "<name>: <text>", encoded, written
//!     → session.quit()          leave announcement, close, receive task joins
//!
//! server → receive task → decode with the session's key → MessageSink
//! ```
//!
//! # Design Decisions
//! - The receive task and the send path share only the read-only key
//! - Connect and key receipt are bounded; steady-state reads are not
//! - Quitting stops networking only; exiting is the binary's decision

pub mod retry;
pub mod session;
pub mod sink;

pub use retry::{connect_with_retry, TargetPrompt};
pub use session::{start_client, ClientSession, SessionError, Target};
pub use sink::{ChannelSink, MessageSink, SinkEvent};
