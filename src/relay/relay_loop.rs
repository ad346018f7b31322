//! Per-connection relay task.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cipher::{self, ShiftKey};
use crate::net::{ConnectionHandle, ConnectionReader, Received};
use crate::observability::metrics;
use crate::relay::registry::ConnectionRegistry;

/// Why a relay loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer ended the stream, or the connection was closed locally.
    Closed,
    /// Reading failed (I/O error or malformed frame).
    ReadFailed,
}

/// Summary returned when a relay loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub peer: SocketAddr,
    pub relayed: u64,
    pub reason: CloseReason,
}

/// Reads messages from one peer and broadcasts them to everyone else.
pub struct RelayLoop {
    handle: Arc<ConnectionHandle>,
    reader: ConnectionReader,
    registry: Arc<ConnectionRegistry>,
    shift: ShiftKey,
}

impl RelayLoop {
    pub fn new(
        handle: Arc<ConnectionHandle>,
        reader: ConnectionReader,
        registry: Arc<ConnectionRegistry>,
        shift: ShiftKey,
    ) -> Self {
        Self {
            handle,
            reader,
            registry,
            shift,
        }
    }

    /// Relay until the connection closes, then close and deregister it.
    pub async fn run(mut self) -> RelayOutcome {
        let peer = self.handle.peer();
        let mut relayed = 0;

        let reason = loop {
            match self.reader.receive_one().await {
                Ok(Received::Message(wire)) if wire.is_empty() => {
                    tracing::trace!(peer = %peer, "Ignoring empty frame");
                }
                Ok(Received::Message(wire)) => {
                    // Round-trip through plaintext so the operator log sees it.
                    let plaintext = cipher::decode(self.shift, &wire);
                    tracing::info!(peer = %peer, message = %plaintext, "Message received");

                    let canonical = cipher::encode(self.shift, &plaintext);
                    let report = self.registry.broadcast_except(&canonical, peer).await;
                    metrics::record_relay(report.delivered, report.failed);
                    relayed += 1;

                    tracing::debug!(
                        peer = %peer,
                        delivered = report.delivered,
                        failed = report.failed,
                        "Message relayed"
                    );
                }
                Ok(Received::Closed) => break CloseReason::Closed,
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Read failed");
                    break CloseReason::ReadFailed;
                }
            }
        };

        self.handle.close().await;
        self.registry.remove(&peer);

        tracing::info!(peer = %peer, relayed, reason = ?reason, "Connection ended");
        RelayOutcome {
            peer,
            relayed,
            reason,
        }
    }
}
