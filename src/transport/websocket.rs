//! WebSocket transport adapter.
//!
//! # Responsibilities
//! - Complete upgrade handshake with client
//! - Decode inbound frames into packets
//! - Offer every packet to the router before normal processing
//! - Write queued outbound frames (replies, emits) to the client
//!
//! # Data Flow
//! ```text
//! text frame → Packet ─┬─→ intercept → Router::try_dispatch → handler
//!                      └─→ message listener (always, routed or not)
//! ```
//!
//! # Design Decisions
//! - Routing is a tap, not a consumer: unrouted traffic still reaches the listener
//! - Handler errors are logged; the connection stays open
//! - Binary frames are not part of the protocol and are skipped

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};

use crate::observability::metrics;
use crate::routing::{Payload, Router};
use crate::transport::connection::{ConnectionGuard, Socket};
use crate::transport::packet::{Frame, Packet};
use crate::transport::server::AppState;

/// Normal processing for inbound packets. Receives whether the router handled it.
pub type MessageListener = Arc<dyn Fn(&Socket, &Packet, bool) + Send + Sync>;

/// Offer a packet to the router. Returns whether a handler fired.
pub fn intercept(router: &Router<Socket>, socket: &Socket, packet: &Packet) -> bool {
    let Some(route) = packet.route() else {
        tracing::trace!(connection_id = %socket.id(), "Packet has no route string");
        metrics::record_dispatch("unrouted", None);
        return false;
    };

    let mut payload = Payload::new(packet.args().to_vec());
    if let Some(ack) = packet.ack {
        payload = payload.with_reply(socket.reply_to(ack));
    }

    match router.try_dispatch(route, payload, socket) {
        Ok(outcome) => {
            metrics::record_dispatch(outcome.as_str(), outcome.verb());
            if outcome.is_handled() {
                tracing::debug!(connection_id = %socket.id(), route = %route, "Handled by router");
            }
            outcome.is_handled()
        }
        Err(e) => {
            tracing::error!(
                connection_id = %socket.id(),
                route = %route,
                verb = %e.verb,
                error = %e.source,
                "Route handler failed"
            );
            metrics::record_dispatch("handler_error", Some(e.verb));
            true
        }
    }
}

/// Upgrade handler mounted on the configured endpoint path.
pub async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(guard) = state.tracker.try_track() else {
        tracing::warn!(
            peer = %peer,
            limit = state.tracker.max_connections(),
            "Connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    ws.max_message_size(state.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, peer, guard))
}

async fn handle_socket(ws: WebSocket, state: AppState, peer: SocketAddr, guard: ConnectionGuard) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
    let socket = Socket::new(guard.id(), peer, outbound_tx);
    let mut closing: watch::Receiver<bool> = state.closing.clone();
    let (mut sink, mut stream) = ws.split();

    tracing::debug!(connection_id = %socket.id(), peer = %peer, "WebSocket connected");

    loop {
        tokio::select! {
            inbound = stream.next() => {
                let msg = match inbound {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %socket.id(), error = %e, "WebSocket read error");
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => {
                        metrics::record_frame("text");
                        handle_text(&state, &socket, text.as_str());
                    }
                    Message::Binary(_) => {
                        metrics::record_frame("binary");
                        tracing::debug!(connection_id = %socket.id(), "Binary frame skipped");
                    }
                    Message::Close(_) => break,
                    // Ping/pong are answered by axum
                    _ => {}
                }
            }
            Some(frame) = outbound_rx.recv() => {
                let text = match frame.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(connection_id = %socket.id(), error = %e, "Dropping outbound frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = closing.changed() => {
                tracing::debug!(connection_id = %socket.id(), "Closing for shutdown");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(connection_id = %socket.id(), "WebSocket connection closed");
    drop(guard);
}

fn handle_text(state: &AppState, socket: &Socket, text: &str) {
    let packet = match Packet::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            metrics::record_frame("invalid");
            tracing::debug!(connection_id = %socket.id(), error = %e, "Skipping malformed frame");
            return;
        }
    };

    let routed = intercept(&state.router, socket, &packet);

    match &state.listener {
        Some(listener) => listener(socket, &packet, routed),
        None if !routed => {
            tracing::trace!(connection_id = %socket.id(), "Unrouted packet with no listener");
        }
        None => {}
    }
}
