//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → sockets told to close → drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, close sockets, drain
//! - Drain has a timeout so a stuck client cannot hold the process open

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
