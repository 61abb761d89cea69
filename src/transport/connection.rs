//! Connection handles and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Provide the `Socket` handle handlers use to reply and emit
//! - Count active connections for limits and shutdown drain

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;
use crate::routing::Reply;
use crate::transport::packet::{Frame, TransportError};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle to one client connection, passed to every handler.
///
/// Cloning is cheap; all clones feed the same outbound queue. Once the
/// connection closes, sends fail with [`TransportError::Closed`].
#[derive(Debug, Clone)]
pub struct Socket {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Frame>,
}

impl Socket {
    pub fn new(id: ConnectionId, peer: SocketAddr, outbound: mpsc::UnboundedSender<Frame>) -> Self {
        Self { id, peer, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Queue a frame for the client.
    pub fn send(&self, frame: Frame) -> Result<(), TransportError> {
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    /// Send an unsolicited `[event, args...]` frame.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), TransportError> {
        let mut data = Vec::with_capacity(args.len() + 1);
        data.push(Value::String(event.to_string()));
        data.extend(args);
        self.send(Frame::Event(data))
    }

    /// Reply callback answering the message with acknowledgement id `ack`.
    pub fn reply_to(&self, ack: u64) -> Reply {
        let socket = self.clone();
        Reply::new(move |data| {
            if socket.send(Frame::Ack { ack, data }).is_err() {
                tracing::trace!(connection_id = %socket.id, ack, "Reply dropped, connection closed");
            }
        })
    }
}

/// Tracks active connections for limits and graceful shutdown.
///
/// Admission and counting happen in one step: a connection is admitted only
/// if it can take a permit from the limit semaphore, and the permit lives in
/// its guard.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl ConnectionTracker {
    /// Create a tracker admitting at most `max_connections` at once.
    pub fn new(max_connections: usize) -> Self {
        Self {
            active_count: Arc::new(AtomicU64::new(0)),
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Admit a new connection, or `None` if the limit is reached.
    /// The returned guard releases the slot when dropped.
    pub fn try_track(&self) -> Option<ConnectionGuard> {
        let permit = Arc::clone(&self.connection_limit).try_acquire_owned().ok()?;
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::connection_opened();
        Some(ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
            _permit: permit,
        })
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Wait until all connections are closed or the timeout elapses.
    /// Returns whether the count reached zero.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let drained = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count and frees its slot when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
    _permit: OwnedSemaphorePermit,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
