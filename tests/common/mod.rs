//! Shared utilities for the chatroom integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chatroom::client::{ChannelSink, SinkEvent};
use chatroom::{start_client, start_server, ChatConfig, ClientSession, ConnectionRegistry, RunningServer};
use tokio::sync::mpsc::UnboundedReceiver;

pub const TEST_SHIFT: u8 = 5;
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

pub fn test_config() -> ChatConfig {
    let mut config = ChatConfig::default();
    config.server.shift = Some(TEST_SHIFT);
    config.server.write_timeout_ms = 500;
    config.client.connect_timeout_secs = 2;
    config
}

/// Start a relay server with a pinned shift on an ephemeral loopback port.
pub async fn start_test_server() -> RunningServer {
    start_server("127.0.0.1", 0, &test_config())
        .await
        .expect("test server failed to bind")
}

/// A connected client plus the events its sink has seen.
pub struct TestClient {
    pub session: ClientSession,
    pub events: UnboundedReceiver<SinkEvent>,
}

impl TestClient {
    /// Next event, or `None` if nothing arrives in time.
    pub async fn next_event(&mut self) -> Option<SinkEvent> {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next message text; panics on close or timeout.
    pub async fn next_message(&mut self) -> String {
        match self.next_event().await {
            Some(SinkEvent::Message(text)) => text,
            other => panic!("expected a message, got {:?}", other),
        }
    }

    /// Assert nothing arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Ok(event) = tokio::time::timeout(window, self.events.recv()).await {
            panic!("expected silence, got {:?}", event);
        }
    }
}

pub async fn connect(server: &RunningServer, name: &str) -> TestClient {
    let (sink, events) = ChannelSink::new();
    let addr = server.local_addr();
    let session = start_client(
        &addr.ip().to_string(),
        addr.port(),
        name,
        &test_config(),
        Arc::new(sink),
    )
    .await
    .expect("client failed to connect");
    TestClient { session, events }
}

/// Connect `names` in order with every join announcement already delivered
/// and drained, so each client starts with an empty event queue.
pub async fn connect_all(server: &RunningServer, names: &[&str]) -> Vec<TestClient> {
    let mut clients: Vec<TestClient> = Vec::with_capacity(names.len());
    for name in names {
        let client = connect(server, name).await;
        if clients.is_empty() {
            // Nobody can observe the first join; give its relay a moment so a
            // later client is not registered in time to receive it.
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let announcement = format!("Server: {} has joined the chatroom!", name);
        for earlier in &mut clients {
            assert_eq!(earlier.next_message().await, announcement);
        }
        clients.push(client);
    }
    clients
}

/// Poll until the server's registry holds `expected` connections.
pub async fn wait_for_registered(server: &RunningServer, expected: usize) {
    wait_for_len(&server.registry(), expected).await;
}

pub async fn wait_for_len(registry: &ConnectionRegistry, expected: usize) {
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while registry.len() != expected {
        if tokio::time::Instant::now() >= deadline {
            panic!("registry has {} connections, expected {}", registry.len(), expected);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
