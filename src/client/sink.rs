//! Presentation-side hooks for a client session.

use tokio::sync::mpsc;

/// Where a session delivers what it receives.
///
/// Called from the session's receive task, so implementations must not block
/// for long.
pub trait MessageSink: Send + Sync {
    /// One decoded line from the chatroom.
    fn on_message_received(&self, text: &str);

    /// The session is over (local quit or server gone). Called exactly once.
    fn on_session_closed(&self) {}
}

/// Event forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Message(String),
    Closed,
}

/// A sink that forwards everything into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn on_message_received(&self, text: &str) {
        // Receiver gone means nobody is displaying anything any more.
        let _ = self.tx.send(SinkEvent::Message(text.to_string()));
    }

    fn on_session_closed(&self) {
        let _ = self.tx.send(SinkEvent::Closed);
    }
}
