//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming message ["/users/4/photos/1/put?crop=false", payload...]
//!     → parser.rs (resource "/users/4/photos/1", verb "put", query)
//!     → verb.rs (classify "put" → PUT)
//!     → table.rs (PUT routes, newest first)
//!     → matcher.rs (first pattern matching the resource)
//!     → handler.rs (invoke with request context, connection, payload)
//!
//! Registration (usually at startup):
//!     verb + path template + handler
//!     → compile template (matcher.rs)
//!     → append to the verb's list (table.rs)
//! ```
//!
//! # Design Decisions
//! - One `Router` value per use-site; no process-wide state
//! - Deterministic: same table and input always pick the same handler
//! - Latest registration wins among patterns matching the same resource

pub mod error;
pub mod handler;
pub mod matcher;
pub mod parser;
pub mod router;
pub mod table;
pub mod verb;

pub use error::{DispatchError, HandlerError, InvalidRouteError, PatternError};
pub use handler::{Handler, HandlerResult, Payload, Reply, RequestContext};
pub use matcher::{is_segment_value, Matcher, Params, Pattern};
pub use parser::ParsedRoute;
pub use router::{Dispatch, Resolved, Router};
pub use verb::{Verb, VerbTable};
