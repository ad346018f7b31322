//! One framed text stream to one remote peer.
//!
//! # Responsibilities
//! - Own the TCP stream exclusively
//! - Track connection state (Open → Closed, never back)
//! - Serialize writes from concurrent senders
//! - Wake a blocked reader when the connection is closed locally
//!
//! # Design Decisions
//! - The stream is split: the read half belongs to exactly one task
//!   ([`ConnectionReader`]), the write half sits behind an async mutex in a
//!   shareable [`ConnectionHandle`]
//! - Closing drops the write half, so nothing can reach the peer afterwards
//! - Identity is the peer's socket address

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::net::codec;

/// Errors raised by a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection is closed")]
    Closed,

    #[error("message exceeds {max} bytes")]
    FrameTooLong { max: usize },

    #[error("message is not ASCII text")]
    NotAscii,

    #[error("message contains a line break")]
    EmbeddedLineBreak,
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Reads and writes are possible.
    Open,
    /// The stream has been released. Terminal.
    Closed,
}

/// Outcome of [`ConnectionReader::receive_one`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(String),
    Closed,
}

/// Shareable write side of a connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    peer: SocketAddr,
    writer: Mutex<Option<OwnedWriteHalf>>,
    closed: watch::Sender<bool>,
    max_frame_len: usize,
}

impl ConnectionHandle {
    /// Remote address; the connection's identity.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        if *self.closed.borrow() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Write one whole message.
    pub async fn send(&self, text: &str) -> Result<(), ConnectionError> {
        self.lock_writer().await.send(text).await
    }

    /// Take exclusive use of the write side.
    ///
    /// No other send can interleave while the guard is held.
    pub async fn lock_writer(&self) -> WriterGuard<'_> {
        WriterGuard {
            inner: self.writer.lock().await,
            max_frame_len: self.max_frame_len,
        }
    }

    /// Release the stream. Returns `false` if it was already closed.
    pub async fn close(&self) -> bool {
        let was_closed = self.closed.send_replace(true);
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            // Peer may already be gone; nothing left to report.
            let _ = writer.shutdown().await;
        }
        if !was_closed {
            tracing::trace!(peer = %self.peer, "Connection closed");
        }
        !was_closed
    }
}

/// Exclusive access to a connection's write half.
pub struct WriterGuard<'a> {
    inner: MutexGuard<'a, Option<OwnedWriteHalf>>,
    max_frame_len: usize,
}

impl WriterGuard<'_> {
    pub async fn send(&mut self, text: &str) -> Result<(), ConnectionError> {
        let writer = self.inner.as_mut().ok_or(ConnectionError::Closed)?;
        codec::write_frame(writer, text, self.max_frame_len).await
    }
}

/// Read side of a connection, owned by a single task.
#[derive(Debug)]
pub struct ConnectionReader {
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    closed: watch::Receiver<bool>,
    max_frame_len: usize,
}

impl ConnectionReader {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Wait for the next message, or for either end to close the stream.
    pub async fn receive_one(&mut self) -> Result<Received, ConnectionError> {
        if *self.closed.borrow() {
            return Ok(Received::Closed);
        }

        tokio::select! {
            biased;
            // Also resolves if the handle is gone, which means nobody can close
            // or write to this connection any more.
            _ = self.closed.wait_for(|closed| *closed) => Ok(Received::Closed),
            frame = codec::read_frame(&mut self.reader, self.max_frame_len) => {
                Ok(frame?.map_or(Received::Closed, Received::Message))
            }
        }
    }
}

/// A freshly established connection, before its halves are handed out.
#[derive(Debug)]
pub struct Connection {
    handle: Arc<ConnectionHandle>,
    reader: ConnectionReader,
}

impl Connection {
    /// Wrap an established stream. Fails only if the peer address is unavailable.
    pub fn new(stream: TcpStream, max_frame_len: usize) -> std::io::Result<Self> {
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        let (closed_tx, closed_rx) = watch::channel(false);

        Ok(Self {
            handle: Arc::new(ConnectionHandle {
                peer,
                writer: Mutex::new(Some(write_half)),
                closed: closed_tx,
                max_frame_len,
            }),
            reader: ConnectionReader {
                peer,
                reader: BufReader::new(read_half),
                closed: closed_rx,
                max_frame_len,
            },
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.handle.peer
    }

    pub fn handle(&self) -> Arc<ConnectionHandle> {
        Arc::clone(&self.handle)
    }

    pub async fn send(&self, text: &str) -> Result<(), ConnectionError> {
        self.handle.send(text).await
    }

    pub async fn receive_one(&mut self) -> Result<Received, ConnectionError> {
        self.reader.receive_one().await
    }

    pub async fn close(&self) -> bool {
        self.handle.close().await
    }

    /// Hand the write side to shared owners and the read side to one task.
    pub fn into_parts(self) -> (Arc<ConnectionHandle>, ConnectionReader) {
        (self.handle, self.reader)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A connected pair: our `Connection` and the raw remote socket.
    pub(crate) async fn connected_pair(max_frame_len: usize) -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let remote = TcpStream::connect(addr).await.unwrap();
        let (local, _) = listener.accept().await.unwrap();
        (Connection::new(local, max_frame_len).unwrap(), remote)
    }

    #[tokio::test]
    async fn send_and_receive() {
        let (mut conn, remote) = connected_pair(1024).await;
        let (remote_read, mut remote_write) = remote.into_split();
        let mut remote_lines = BufReader::new(remote_read).lines();

        conn.send("mjqqt").await.unwrap();
        assert_eq!(remote_lines.next_line().await.unwrap().as_deref(), Some("mjqqt"));

        remote_write.write_all(b"one\ntwo\n").await.unwrap();
        assert_eq!(conn.receive_one().await.unwrap(), Received::Message("one".into()));
        assert_eq!(conn.receive_one().await.unwrap(), Received::Message("two".into()));
    }

    #[tokio::test]
    async fn remote_close_is_reported_as_closed() {
        let (mut conn, remote) = connected_pair(1024).await;
        drop(remote);
        assert_eq!(conn.receive_one().await.unwrap(), Received::Closed);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_writes() {
        let (conn, _remote) = connected_pair(1024).await;
        assert_eq!(conn.handle().state(), ConnectionState::Open);

        assert!(conn.close().await);
        assert!(!conn.close().await);
        assert_eq!(conn.handle().state(), ConnectionState::Closed);
        assert!(matches!(conn.send("late").await, Err(ConnectionError::Closed)));
    }

    #[tokio::test]
    async fn local_close_wakes_blocked_reader() {
        let (conn, _remote) = connected_pair(1024).await;
        let (handle, mut reader) = conn.into_parts();

        let pending = tokio::spawn(async move { reader.receive_one().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;

        let received = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("reader stayed blocked")
            .unwrap()
            .unwrap();
        assert_eq!(received, Received::Closed);
    }

    #[tokio::test]
    async fn writer_guard_holds_off_other_senders() {
        let (conn, remote) = connected_pair(1024).await;
        let handle = conn.handle();
        let mut lines = BufReader::new(remote).lines();

        let mut guard = handle.lock_writer().await;
        let other = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.send("second").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        guard.send("first").await.unwrap();
        drop(guard);
        other.await.unwrap().unwrap();

        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("second"));
    }
}
