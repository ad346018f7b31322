//! Relay server: accept loop, key exchange and per-connection task spawning.
//!
//! # Responsibilities
//! - Bind the listener (fatal on failure)
//! - Admit each new connection with the shift key under the zero shift
//! - Spawn one [`RelayLoop`] per connection
//! - Stop accepting and close every connection on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cipher::{ShiftKey, ShiftKeyError};
use crate::config::ChatConfig;
use crate::lifecycle::Shutdown;
use crate::net::{Connection, ConnectionError, ConnectionPermit, Listener, ListenerError};
use crate::relay::registry::ConnectionRegistry;
use crate::relay::relay_loop::RelayLoop;

/// Errors that stop the server as a whole.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("invalid shift key: {0}")]
    Shift(#[from] ShiftKeyError),
}

/// A bound relay server, ready to run.
pub struct ChatServer {
    listener: Listener,
    registry: Arc<ConnectionRegistry>,
    shift: ShiftKey,
    max_message_bytes: usize,
}

impl ChatServer {
    /// Bind `host:port` and fix the shift key for this server's lifetime.
    pub async fn bind(host: &str, port: u16, config: &ChatConfig) -> Result<Self, ServerError> {
        let shift = config.server.shift_key()?;
        let listener = Listener::bind(host, port, config.server.max_connections).await?;

        tracing::info!(
            shift = %shift,
            max_message_bytes = config.protocol.max_message_bytes,
            "Shift key selected"
        );

        Ok(Self {
            listener,
            registry: Arc::new(ConnectionRegistry::new(config.server.write_timeout())),
            shift,
            max_message_bytes: config.protocol.max_message_bytes,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    pub fn shift(&self) -> ShiftKey {
        self.shift
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until `shutdown` fires, then close them all.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = self.listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, "Chat server listening");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.provision(stream, peer, permit),
                    Err(ListenerError::Closed) => break,
                    Err(e) => tracing::warn!(error = %e, "Accept failed"),
                }
            }
        }

        let closed = self.registry.close_all().await;
        tracing::info!(closed, "Chat server stopped");
        Ok(())
    }

    /// Hand the new stream to its own task: key exchange, registration, relay.
    fn provision(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let connection = match Connection::new(stream, self.max_message_bytes) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Dropping connection without peer address");
                return;
            }
        };

        let registry = self.registry();
        let shift = self.shift;
        tokio::spawn(async move {
            let (handle, reader) = connection.into_parts();

            match registry.admit(Arc::clone(&handle), &shift.to_wire()).await {
                Ok(()) => {}
                Err(ConnectionError::Closed) if registry.is_closed() => {
                    tracing::debug!(peer = %peer, "Server shutting down, dropping new connection");
                    handle.close().await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Failed to send shift key");
                    handle.close().await;
                    return;
                }
            }
            tracing::info!(peer = %peer, "Client connected");

            RelayLoop::new(handle, reader, registry, shift).run().await;
            drop(permit);
        });
    }
}

/// A server running on a background task.
pub struct RunningServer {
    local_addr: SocketAddr,
    shift: ShiftKey,
    registry: Arc<ConnectionRegistry>,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shift(&self) -> ShiftKey {
        self.shift
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Stop accepting, close every connection and wait for the accept loop.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Server task did not finish cleanly");
                Ok(())
            }
        }
    }
}

/// Bind `host:port` and run the relay server in the background.
pub async fn start_server(host: &str, port: u16, config: &ChatConfig) -> Result<RunningServer, ServerError> {
    let server = ChatServer::bind(host, port, config).await?;
    let local_addr = server.local_addr().map_err(ListenerError::Accept)?;
    let shift = server.shift();
    let registry = server.registry();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(shutdown.subscribe()));

    Ok(RunningServer {
        local_addr,
        shift,
        registry,
        shutdown,
        task,
    })
}
