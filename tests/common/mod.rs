//! Shared utilities for WebSocket integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use socket_router::transport::ConnectionTracker;
use socket_router::{RouterConfig, Shutdown, SocketServer};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<RouterConfig>,
    pub connections: ConnectionTracker,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn connect(&self) -> Client {
        let (client, _response) = connect_async(self.url()).await.unwrap();
        client
    }
}

/// Bind 127.0.0.1:0 and run `server` in the background.
pub async fn start(server: SocketServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = server.connections();
    let shutdown = Shutdown::new();
    let (updates, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(server.run(listener, rx, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        updates,
        connections,
        handle,
    }
}

pub async fn send(client: &mut Client, frame: Value) {
    client.send(Message::text(frame.to_string())).await.unwrap();
}

pub async fn send_raw(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
pub async fn recv(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("no frame within timeout")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Wait until the tracker reports `count` active connections.
pub async fn wait_for_connections(tracker: &ConnectionTracker, count: u64) {
    tokio::time::timeout(RECV_TIMEOUT, async {
        while tracker.active_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}
