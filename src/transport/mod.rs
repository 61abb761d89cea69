//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP accept (axum::serve)
//!     → server.rs (upgrade endpoint, connection limit)
//!     → websocket.rs (per-socket read/write loop)
//!     → packet.rs (JSON frame decode)
//!     → Router dispatch, then the message listener
//!
//! Replies and emits:
//!     handler → Socket (connection.rs) → outbound queue → websocket.rs writer
//! ```
//!
//! # Design Decisions
//! - One task per socket; reads and writes share it through `select!`
//! - Outbound frames are queued so handlers never block on the network

pub mod connection;
pub mod packet;
pub mod server;
pub mod websocket;

pub use connection::{ConnectionId, ConnectionTracker, Socket};
pub use packet::{Frame, Packet, TransportError};
pub use server::SocketServer;
pub use websocket::{intercept, MessageListener};
