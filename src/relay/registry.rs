//! The set of live connections on the server.
//!
//! # Responsibilities
//! - Insert and remove connections by peer address
//! - Fan a message out to every connection except its origin
//! - Close everything on administrative shutdown
//!
//! # Design Decisions
//! - The map lock is held only long enough to snapshot recipients; writes
//!   happen concurrently outside it, so one broadcast never serializes
//!   behind another
//! - A failed or timed-out delivery is logged and counted, and the recipient
//!   is closed: a write cut short leaves a partial line on the stream, and
//!   nothing may follow it. The recipient is removed by its own relay loop.
//! - Each delivery is bounded by a write timeout so a stalled peer cannot
//!   hold up the sender's relay loop
//! - Once `close_all` has run the registry admits nothing new

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;

use crate::net::{ConnectionError, ConnectionHandle};
use crate::observability::metrics;

/// Result of one [`ConnectionRegistry::broadcast_except`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn recipients(&self) -> usize {
        self.delivered + self.failed
    }
}

enum Insert {
    Added,
    Duplicate,
    Closed,
}

/// Concurrency-safe collection of open connections keyed by peer address.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<SocketAddr, Arc<ConnectionHandle>>>,
    // Only written with `connections` locked.
    closed: AtomicBool,
    write_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            write_timeout,
        }
    }

    /// Insert a connection. Returns `false` (and changes nothing) if its peer
    /// is already registered or the registry has been closed.
    pub fn add(&self, connection: Arc<ConnectionHandle>) -> bool {
        matches!(self.insert(connection), Insert::Added)
    }

    fn insert(&self, connection: Arc<ConnectionHandle>) -> Insert {
        let mut connections = self.connections.lock().expect("registry mutex poisoned");
        if self.closed.load(Ordering::Acquire) {
            return Insert::Closed;
        }
        let peer = connection.peer();
        if connections.contains_key(&peer) {
            return Insert::Duplicate;
        }
        connections.insert(peer, connection);
        metrics::record_connection_opened();
        Insert::Added
    }

    /// Whether [`close_all`](Self::close_all) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Remove a connection if present. Safe to call from several teardown paths.
    pub fn remove(&self, peer: &SocketAddr) -> bool {
        let removed = self
            .connections
            .lock()
            .expect("registry mutex poisoned")
            .remove(peer)
            .is_some();
        if removed {
            metrics::record_connection_closed();
        }
        removed
    }

    /// Register `connection` and write `greeting` to it as its first message.
    ///
    /// The connection's write lock is taken before it becomes visible to
    /// broadcasts, so every broadcast issued after this call returns reaches
    /// the peer, and none reaches it ahead of the greeting. On failure the
    /// connection is deregistered again. A closed registry refuses with
    /// [`ConnectionError::Closed`] and writes nothing.
    pub async fn admit(
        &self,
        connection: Arc<ConnectionHandle>,
        greeting: &str,
    ) -> Result<(), ConnectionError> {
        let peer = connection.peer();
        let mut writer = connection.lock_writer().await;

        match self.insert(Arc::clone(&connection)) {
            Insert::Added => {}
            Insert::Duplicate => tracing::warn!(peer = %peer, "Connection already registered"),
            Insert::Closed => return Err(ConnectionError::Closed),
        }

        if let Err(e) = writer.send(greeting).await {
            drop(writer);
            self.remove(&peer);
            return Err(e);
        }
        Ok(())
    }

    /// Deliver `message` to every registered connection except `origin`.
    pub async fn broadcast_except(&self, message: &str, origin: SocketAddr) -> BroadcastReport {
        let recipients: Vec<Arc<ConnectionHandle>> = self
            .connections
            .lock()
            .expect("registry mutex poisoned")
            .iter()
            .filter(|(peer, _)| **peer != origin)
            .map(|(_, connection)| Arc::clone(connection))
            .collect();

        let outcomes = join_all(
            recipients
                .iter()
                .map(|connection| tokio::time::timeout(self.write_timeout, connection.send(message))),
        )
        .await;

        let mut report = BroadcastReport::default();
        for (connection, outcome) in recipients.iter().zip(outcomes) {
            let peer = connection.peer();
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(peer = %peer, origin = %origin, error = %e, "Delivery failed");
                    // Other errors reject the message before any byte is written.
                    if matches!(e, ConnectionError::Io(_)) {
                        connection.close().await;
                    }
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!(
                        peer = %peer,
                        origin = %origin,
                        timeout_ms = self.write_timeout.as_millis() as u64,
                        "Delivery timed out"
                    );
                    connection.close().await;
                }
            }
        }
        report
    }

    /// Close every registered connection and refuse any later admission.
    /// Relay loops deregister their own connections.
    pub async fn close_all(&self) -> usize {
        let connections: Vec<Arc<ConnectionHandle>> = {
            let connections = self.connections.lock().expect("registry mutex poisoned");
            self.closed.store(true, Ordering::Release);
            connections.values().cloned().collect()
        };

        for connection in &connections {
            connection.close().await;
        }
        connections.len()
    }

    pub fn contains(&self, peer: &SocketAddr) -> bool {
        self.connections
            .lock()
            .expect("registry mutex poisoned")
            .contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses of every registered connection, in no particular order.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.connections
            .lock()
            .expect("registry mutex poisoned")
            .keys()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::tests::connected_pair;
    use crate::net::Connection;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
    use tokio::net::TcpStream;

    async fn registered(
        registry: &ConnectionRegistry,
    ) -> (Connection, Lines<BufReader<TcpStream>>) {
        let (conn, remote) = connected_pair(1024).await;
        assert!(registry.add(conn.handle()));
        (conn, BufReader::new(remote).lines())
    }

    async fn next_line(lines: &mut Lines<BufReader<TcpStream>>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    #[tokio::test]
    async fn add_and_remove_are_idempotent() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        let (conn, _remote) = connected_pair(1024).await;

        assert!(registry.add(conn.handle()));
        assert!(!registry.add(conn.handle()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&conn.peer()));

        assert!(registry.remove(&conn.peer()));
        assert!(!registry.remove(&conn.peer()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn broadcast_skips_origin() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        let (a, mut a_lines) = registered(&registry).await;
        let (_b, mut b_lines) = registered(&registry).await;
        let (_c, mut c_lines) = registered(&registry).await;

        let report = registry.broadcast_except("mjqqt", a.peer()).await;
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });

        assert_eq!(next_line(&mut b_lines).await.as_deref(), Some("mjqqt"));
        assert_eq!(next_line(&mut c_lines).await.as_deref(), Some("mjqqt"));

        a.close().await;
        assert_eq!(next_line(&mut a_lines).await, None);
    }

    #[tokio::test]
    async fn failed_recipient_does_not_stop_fan_out() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        let (origin, _origin_lines) = registered(&registry).await;
        let (dead, _dead_lines) = registered(&registry).await;
        let (_alive, mut alive_lines) = registered(&registry).await;

        dead.close().await;

        let report = registry.broadcast_except("still here", origin.peer()).await;
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(next_line(&mut alive_lines).await.as_deref(), Some("still here"));

        // Deregistration is left to the dead connection's own relay loop.
        assert!(registry.contains(&dead.peer()));
    }

    #[tokio::test]
    async fn admit_sends_greeting_before_any_broadcast() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        let (sender, _sender_lines) = registered(&registry).await;

        let (newcomer, remote) = connected_pair(1024).await;
        let mut lines = BufReader::new(remote).lines();
        registry.admit(newcomer.handle(), "5").await.unwrap();
        registry.broadcast_except("after", sender.peer()).await;

        assert_eq!(next_line(&mut lines).await.as_deref(), Some("5"));
        assert_eq!(next_line(&mut lines).await.as_deref(), Some("after"));
    }

    #[tokio::test]
    async fn admit_failure_leaves_registry_unchanged() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        let (conn, _remote) = connected_pair(1024).await;
        conn.close().await;

        assert!(registry.admit(conn.handle(), "5").await.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn close_all_closes_every_connection() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        let (a, mut a_lines) = registered(&registry).await;
        let (b, mut b_lines) = registered(&registry).await;

        assert_eq!(registry.close_all().await, 2);
        assert!(!a.handle().is_open());
        assert!(!b.handle().is_open());
        assert_eq!(next_line(&mut a_lines).await, None);
        assert_eq!(next_line(&mut b_lines).await, None);
    }

    #[tokio::test]
    async fn stalled_recipient_is_closed_instead_of_receiving_a_spliced_line() {
        const FRAME: usize = 60_000;
        let registry = ConnectionRegistry::new(Duration::from_millis(100));
        let (origin, _origin_remote) = connected_pair(FRAME).await;
        let (stalled, mut stalled_remote) = connected_pair(FRAME).await;
        registry.add(origin.handle());
        registry.add(stalled.handle());

        // Nobody reads `stalled_remote`, so the socket buffers eventually fill.
        let payload = "x".repeat(FRAME);
        let mut timed_out = false;
        for _ in 0..2_000 {
            let report = registry.broadcast_except(&payload, origin.peer()).await;
            if report.failed == 1 {
                timed_out = true;
                break;
            }
        }
        assert!(timed_out, "socket buffers never filled");
        assert!(!stalled.handle().is_open());

        let report = registry.broadcast_except("b", origin.peer()).await;
        assert_eq!(report, BroadcastReport { delivered: 0, failed: 1 });

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(10), stalled_remote.read_to_end(&mut received))
            .await
            .expect("stream was not closed")
            .unwrap();

        let mut segments: Vec<&[u8]> = received.split(|b| *b == b'\n').collect();
        let tail = segments.pop().unwrap_or_default();
        assert!(!segments.is_empty());
        for line in segments {
            assert_eq!(line, payload.as_bytes());
        }
        // Only the write that was cut short may be partial, and nothing follows it.
        assert!(payload.as_bytes().starts_with(tail));
    }

    #[tokio::test]
    async fn admit_after_close_all_is_refused() {
        let registry = ConnectionRegistry::new(Duration::from_secs(1));
        assert_eq!(registry.close_all().await, 0);
        assert!(registry.is_closed());

        let (late, remote) = connected_pair(1024).await;
        let err = registry.admit(late.handle(), "5").await.unwrap_err();
        assert!(matches!(err, ConnectionError::Closed));
        assert!(registry.is_empty());
        assert!(!registry.add(late.handle()));

        // Nothing, not even the key, was written.
        late.close().await;
        let mut lines = BufReader::new(remote).lines();
        assert_eq!(next_line(&mut lines).await, None);
    }
}
