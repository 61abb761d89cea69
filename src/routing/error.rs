//! Routing error types.

use thiserror::Error;

use crate::routing::verb::Verb;

/// Errors produced while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unbalanced parentheses at offset {0}")]
    UnbalancedParens(usize),

    #[error("parameter name expected after ':' at offset {0}")]
    EmptyName(usize),

    #[error("parameter `{0}` appears more than once")]
    DuplicateName(String),

    #[error("pattern ends with a dangling escape")]
    DanglingEscape,

    #[error("compiled expression rejected: {0}")]
    Regex(String),
}

/// Registration-time failure. The route table is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRouteError {
    #[error("unknown verb `{0}` (expected POST, GET, PUT or DELETE)")]
    UnknownVerb(String),

    #[error("route pattern must not be empty")]
    EmptyPattern,

    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },
}

/// Error returned by a handler. The router hands it back untouched.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A handler failure seen by [`Router::try_dispatch`](crate::routing::Router::try_dispatch),
/// tagged with the verb it was dispatched under.
#[derive(Debug, Error)]
#[error("{verb} handler failed: {source}")]
pub struct DispatchError {
    pub verb: Verb,
    #[source]
    pub source: HandlerError,
}

impl DispatchError {
    /// The handler's own error.
    pub fn into_inner(self) -> HandlerError {
        self.source
    }
}
