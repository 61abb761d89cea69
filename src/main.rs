//! socket-router demo server.
//!
//! Serves an in-memory key/value resource over WebSocket messages:
//!
//! ```text
//! client                                   server
//!   {"ack":1,"data":["/kv/create?key=a", 1]}  →  POST /kv
//!   ←  {"ack":1,"data":[null,"a"]}
//!   {"ack":2,"data":["/kv/a/read"]}           →  GET /kv/:key
//!   ←  {"ack":2,"data":[null,1]}
//! ```
//!
//! Messages no route handles are logged by the fallback listener.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use socket_router::config::{load_config, ConfigWatcher, RouterConfig};
use socket_router::kv::KvStore;
use socket_router::lifecycle::{signals, Shutdown};
use socket_router::observability::{logging, metrics};
use socket_router::{Router, Socket, SocketServer};

#[derive(Parser)]
#[command(name = "socket-router")]
#[command(about = "Verb-and-resource routing for WebSocket messages", long_about = None)]
struct Cli {
    /// TOML config file; watched for verb table changes
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("socket-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.listener.path,
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload; without a config file the channel simply stays idle
    let (updates, _watcher_guard, _idle_tx) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?), None)
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (rx, None, Some(tx))
        }
    };

    let router: Arc<Router<Socket>> = Arc::new(Router::new());
    let store = KvStore::new();
    store.register(&*router)?;

    let server = SocketServer::new(config.clone(), router).on_message(|socket, packet, routed| {
        if !routed {
            tracing::info!(
                connection_id = %socket.id(),
                route = ?packet.route(),
                "Unrouted message"
            );
        }
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    server.run(listener, updates, shutdown.subscribe()).await?;

    tracing::info!(entries = store.len(), "Shutdown complete");
    Ok(())
}
