//! WebSocket server setup.
//!
//! # Responsibilities
//! - Create Axum Router with the upgrade endpoint
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Apply verb table reloads to the live router
//! - Close open sockets and drain them on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router as HttpRouter};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tower_http::trace::TraceLayer;

use crate::config::RouterConfig;
use crate::routing::Router;
use crate::transport::connection::{ConnectionTracker, Socket};
use crate::transport::packet::Packet;
use crate::transport::websocket::{ws_handler, MessageListener};

/// How long open sockets get to close after shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state injected into the upgrade handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router<Socket>>,
    pub listener: Option<MessageListener>,
    pub tracker: ConnectionTracker,
    pub max_message_bytes: usize,
    pub closing: watch::Receiver<bool>,
}

/// WebSocket server feeding every inbound message through a [`Router`].
pub struct SocketServer {
    config: RouterConfig,
    router: Arc<Router<Socket>>,
    listener: Option<MessageListener>,
    tracker: ConnectionTracker,
}

impl SocketServer {
    /// Create a server. The router's verb table is replaced by the configured one.
    pub fn new(config: RouterConfig, router: Arc<Router<Socket>>) -> Self {
        router.set_verb_table(config.verbs.to_table());
        let tracker = ConnectionTracker::new(config.listener.max_connections);
        Self {
            config,
            router,
            listener: None,
            tracker,
        }
    }

    /// Install the normal-processing listener. It sees every decoded packet
    /// after the router, along with whether a route handled it.
    pub fn on_message<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Socket, &Packet, bool) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn router(&self) -> &Arc<Router<Socket>> {
        &self.router
    }

    /// Active connection tracker.
    pub fn connections(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    fn build_router(path: &str, state: AppState) -> HttpRouter {
        HttpRouter::new()
            .route(path, get(ws_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` fires.
    ///
    /// Configs received on `config_updates` swap the router's verb table;
    /// listener settings only take effect on restart.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let (closing_tx, closing_rx) = watch::channel(false);

        let state = AppState {
            router: Arc::clone(&self.router),
            listener: self.listener.clone(),
            tracker: self.tracker.clone(),
            max_message_bytes: self.config.listener.max_message_bytes,
            closing: closing_rx,
        };

        let reload = tokio::spawn(apply_updates(
            Arc::clone(&self.router),
            self.config.clone(),
            config_updates,
        ));

        tracing::info!(
            address = %addr,
            path = %self.config.listener.path,
            max_connections = self.config.listener.max_connections,
            "WebSocket server starting"
        );

        let app = Self::build_router(&self.config.listener.path, state)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, closing sockets");
                let _ = closing_tx.send(true);
            })
            .await?;

        reload.abort();

        if !self.tracker.wait_for_drain(DRAIN_TIMEOUT).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Connections still open after drain timeout"
            );
        }

        tracing::info!("WebSocket server stopped");
        Ok(())
    }
}

async fn apply_updates(
    router: Arc<Router<Socket>>,
    current: RouterConfig,
    mut updates: mpsc::UnboundedReceiver<RouterConfig>,
) {
    while let Some(config) = updates.recv().await {
        router.set_verb_table(config.verbs.to_table());
        tracing::info!("Verb table reloaded");

        if config.listener != current.listener {
            tracing::warn!("Listener settings changed; restart to apply");
        }
    }
}
