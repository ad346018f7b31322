//! Client side of the chatroom protocol.
//!
//! # Lifecycle
//! ```text
//! connect (bounded) → receive shift key (shift 0, bounded)
//!     → spawn receive task (decode → sink)
//!     → announce join
//!     → send / receive independently
//!     → quit: announce leave, close, join receive task
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::cipher::{self, ShiftKey};
use crate::client::sink::MessageSink;
use crate::config::ChatConfig;
use crate::net::{Connection, ConnectionError, ConnectionHandle, ConnectionReader, Received};

/// Errors surfaced to the presentation layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not connect to {target}: {source}")]
    Connect {
        target: Target,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {target} after {timeout:?}")]
    ConnectTimeout { target: Target, timeout: Duration },

    #[error("key exchange with {target} failed: {reason}")]
    KeyExchange { target: Target, reason: String },

    #[error("display name must be non-empty ASCII without line breaks")]
    InvalidName,

    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl SessionError {
    /// Failures where asking the user for another server makes sense.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectTimeout { .. } | Self::KeyExchange { .. }
        )
    }
}

/// A server endpoint to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for Target {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

pub fn join_announcement(display_name: &str) -> String {
    format!("Server: {} has joined the chatroom!", display_name)
}

pub fn leave_announcement(display_name: &str) -> String {
    format!("Server: {} has left the chatroom!", display_name)
}

/// One connection to the server plus its receive task.
pub struct ClientSession {
    display_name: String,
    shift: ShiftKey,
    server: SocketAddr,
    handle: Arc<ConnectionHandle>,
    receiver: JoinHandle<()>,
}

impl ClientSession {
    /// Connect, receive the key, start receiving and announce the join.
    pub async fn connect(
        target: &Target,
        display_name: &str,
        config: &ChatConfig,
        sink: Arc<dyn MessageSink>,
    ) -> Result<Self, SessionError> {
        let display_name = display_name.trim();
        if display_name.is_empty()
            || !display_name.is_ascii()
            || display_name.contains(['\n', '\r'])
        {
            return Err(SessionError::InvalidName);
        }

        let timeout = config.client.connect_timeout();
        tracing::info!(server = %target, "Attempting connection");

        let stream = match tokio::time::timeout(
            timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(SessionError::Connect {
                    target: target.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    target: target.clone(),
                    timeout,
                })
            }
        };

        let connection = Connection::new(stream, config.protocol.max_message_bytes).map_err(|source| {
            SessionError::Connect {
                target: target.clone(),
                source,
            }
        })?;
        let server = connection.peer();
        let (handle, mut reader) = connection.into_parts();

        let shift = match receive_shift_key(&mut reader, timeout).await {
            Ok(shift) => shift,
            Err(reason) => {
                handle.close().await;
                return Err(SessionError::KeyExchange {
                    target: target.clone(),
                    reason,
                });
            }
        };
        tracing::info!(server = %server, "Connected");

        let receiver = tokio::spawn(receive_messages(reader, shift, sink));
        let session = Self {
            display_name: display_name.to_string(),
            shift,
            server,
            handle,
            receiver,
        };

        session.send_line(&join_announcement(&session.display_name)).await?;
        Ok(session)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn shift(&self) -> ShiftKey {
        self.shift
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Whether both the connection and the receive task are still alive.
    pub fn is_open(&self) -> bool {
        self.handle.is_open() && !self.receiver.is_finished()
    }

    /// Send one line of user text, labelled with the display name.
    ///
    /// Line breaks inside `text` become spaces.
    pub async fn send(&self, text: &str) -> Result<(), SessionError> {
        let text = text.replace(['\r', '\n'], " ");
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.send_line(&format!("{}: {}", self.display_name, text)).await
    }

    /// Announce the leave, release the connection and wait for the receive
    /// task; the sink sees `on_session_closed`. Does not exit the process.
    pub async fn quit(self) -> Result<(), SessionError> {
        let farewell = self.send_line(&leave_announcement(&self.display_name)).await;
        self.handle.close().await;

        if let Err(e) = self.receiver.await {
            tracing::warn!(error = %e, "Receive task ended abnormally");
        }
        tracing::info!(server = %self.server, "Disconnected");
        farewell
    }

    async fn send_line(&self, plaintext: &str) -> Result<(), SessionError> {
        self.handle
            .send(&cipher::encode(self.shift, plaintext))
            .await
            .map_err(SessionError::from)
    }
}

async fn receive_shift_key(reader: &mut ConnectionReader, timeout: Duration) -> Result<ShiftKey, String> {
    match tokio::time::timeout(timeout, reader.receive_one()).await {
        Ok(Ok(Received::Message(frame))) => ShiftKey::from_wire(&frame).map_err(|e| e.to_string()),
        Ok(Ok(Received::Closed)) => Err("server closed the connection".to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no shift key within {:?}", timeout)),
    }
}

async fn receive_messages(mut reader: ConnectionReader, shift: ShiftKey, sink: Arc<dyn MessageSink>) {
    loop {
        match reader.receive_one().await {
            Ok(Received::Message(wire)) if wire.is_empty() => {}
            Ok(Received::Message(wire)) => sink.on_message_received(&cipher::decode(shift, &wire)),
            Ok(Received::Closed) => break,
            Err(e) => {
                tracing::debug!(server = %reader.peer(), error = %e, "Receive failed");
                break;
            }
        }
    }
    sink.on_session_closed();
}

/// Connect to `host:port` as `display_name`.
pub async fn start_client(
    host: &str,
    port: u16,
    display_name: &str,
    config: &ChatConfig,
    sink: Arc<dyn MessageSink>,
) -> Result<ClientSession, SessionError> {
    ClientSession::connect(&Target::new(host, port), display_name, config, sink).await
}
