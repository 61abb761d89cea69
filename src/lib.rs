//! Message routing for WebSocket connections.
//!
//! Clients send `["/users/4/photos/put?crop=false", payload...]`; the router
//! splits the route into resource, verb and query, finds the newest handler
//! whose pattern matches the resource and calls it with the extracted
//! parameters, the connection handle and the remaining arguments.

pub mod config;
pub mod kv;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod transport;

pub use config::RouterConfig;
pub use lifecycle::Shutdown;
pub use routing::{Payload, RequestContext, Router, Verb, VerbTable};
pub use transport::{Socket, SocketServer};
