//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Validate and store routes per verb
//! - Turn a route string into a handler invocation
//! - Report misses without failing
//!
//! # Design Decisions
//! - Later registrations shadow earlier ones: candidates are tried newest first
//! - The first matching candidate fires; nothing else is tried
//! - A miss (unparsable route, unknown verb, no pattern) is a normal outcome
//!   on a shared channel and only traced
//! - Handler errors come back to the caller as-is

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::error::{DispatchError, HandlerError, InvalidRouteError};
use crate::routing::handler::{Handler, HandlerResult, Payload, RequestContext};
use crate::routing::matcher::{Matcher, Pattern};
use crate::routing::parser::{self, ParsedRoute};
use crate::routing::table::{RegisteredRoute, RouteTable};
use crate::routing::verb::{Verb, VerbTable};

/// What `try_dispatch` did with a route string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler registered for the verb was invoked.
    Handled(Verb),
    /// The route string had no verb segment or was not a valid URL.
    Unparsable,
    /// The verb expression matched no verb.
    UnknownVerb,
    /// No pattern registered for the verb matched the resource.
    NoMatch(Verb),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }

    pub fn verb(&self) -> Option<Verb> {
        match self {
            Dispatch::Handled(verb) | Dispatch::NoMatch(verb) => Some(*verb),
            Dispatch::Unparsable | Dispatch::UnknownVerb => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dispatch::Handled(_) => "handled",
            Dispatch::Unparsable => "unparsable",
            Dispatch::UnknownVerb => "unknown_verb",
            Dispatch::NoMatch(_) => "no_match",
        }
    }
}

/// A resolved route: the verb, the context a handler would receive and the
/// position of the winning route in that verb's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub verb: Verb,
    pub context: RequestContext,
    pub index: usize,
}

/// Routes messages for connections of type `C` to handlers.
pub struct Router<C> {
    routes: RouteTable<C>,
    verbs: ArcSwap<VerbTable>,
}

impl<C: 'static> Router<C> {
    /// Create a router with the default synonym table.
    pub fn new() -> Self {
        Self::with_verbs(VerbTable::default())
    }

    /// Create a router with a custom synonym table.
    pub fn with_verbs(verbs: VerbTable) -> Self {
        Self {
            routes: RouteTable::new(),
            verbs: ArcSwap::from_pointee(verbs),
        }
    }

    /// Current synonym table.
    pub fn verb_table(&self) -> Arc<VerbTable> {
        self.verbs.load_full()
    }

    /// Replace the synonym table. Dispatches already in flight keep the old one.
    pub fn set_verb_table(&self, verbs: VerbTable) {
        self.verbs.store(Arc::new(verbs));
        tracing::info!("Verb table replaced");
    }

    /// Register a route by verb label (`"POST"`, `"GET"`, `"PUT"`, `"DELETE"`).
    pub fn add<F>(&self, verb: &str, pattern: &str, handler: F) -> Result<(), InvalidRouteError>
    where
        F: Fn(RequestContext, &C, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        let verb: Verb = verb.parse()?;
        self.route(verb, pattern, handler)
    }

    /// Register a route for `verb`, compiling `pattern` as a path template.
    pub fn route<H>(&self, verb: Verb, pattern: &str, handler: H) -> Result<(), InvalidRouteError>
    where
        H: Handler<C> + 'static,
    {
        if pattern.is_empty() {
            return Err(InvalidRouteError::EmptyPattern);
        }
        let compiled = Pattern::new(pattern).map_err(|source| InvalidRouteError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.route_with(verb, compiled, handler);
        Ok(())
    }

    /// Register a route for `verb` with a caller-supplied matcher.
    pub fn route_with<M, H>(&self, verb: Verb, matcher: M, handler: H)
    where
        M: Matcher + 'static,
        H: Handler<C> + 'static,
    {
        tracing::debug!(verb = %verb, matcher = ?matcher, "Route registered");
        self.routes.push(
            verb,
            RegisteredRoute {
                matcher: Box::new(matcher),
                handler: Arc::new(handler),
            },
        );
    }

    pub fn post<F>(&self, pattern: &str, handler: F) -> Result<(), InvalidRouteError>
    where
        F: Fn(RequestContext, &C, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Verb::Post, pattern, handler)
    }

    pub fn get<F>(&self, pattern: &str, handler: F) -> Result<(), InvalidRouteError>
    where
        F: Fn(RequestContext, &C, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Verb::Get, pattern, handler)
    }

    pub fn put<F>(&self, pattern: &str, handler: F) -> Result<(), InvalidRouteError>
    where
        F: Fn(RequestContext, &C, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Verb::Put, pattern, handler)
    }

    pub fn delete<F>(&self, pattern: &str, handler: F) -> Result<(), InvalidRouteError>
    where
        F: Fn(RequestContext, &C, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Verb::Delete, pattern, handler)
    }

    /// Number of routes registered for `verb`.
    pub fn route_count(&self, verb: Verb) -> usize {
        self.routes.len(verb)
    }

    /// Dispatch a message. Returns `Ok(true)` iff a handler fired.
    pub fn dispatch(&self, route: &str, payload: Payload, conn: &C) -> Result<bool, HandlerError> {
        self.try_dispatch(route, payload, conn)
            .map(|outcome| outcome.is_handled())
            .map_err(DispatchError::into_inner)
    }

    /// Dispatch a message and report how it was routed. A handler error
    /// comes back with the verb it was dispatched under.
    pub fn try_dispatch(
        &self,
        route: &str,
        payload: Payload,
        conn: &C,
    ) -> Result<Dispatch, DispatchError> {
        let (verb, parsed) = match self.classify(route) {
            Ok(found) => found,
            Err(miss) => return Ok(miss),
        };

        let candidates = self.routes.snapshot(verb);
        for candidate in candidates.iter().rev() {
            if let Some(params) = candidate.matcher.match_path(&parsed.resource) {
                tracing::debug!(verb = %verb, route = %route, "Dispatching");
                let req = RequestContext {
                    query: parsed.query,
                    params,
                    resource: parsed.resource,
                };
                candidate
                    .handler
                    .call(req, conn, payload)
                    .map_err(|source| DispatchError { verb, source })?;
                return Ok(Dispatch::Handled(verb));
            }
        }

        tracing::trace!(verb = %verb, route = %route, "No route matched");
        Ok(Dispatch::NoMatch(verb))
    }

    /// Work out which route would handle `route` without invoking it.
    pub fn resolve(&self, route: &str) -> Option<Resolved> {
        let (verb, parsed) = self.classify(route).ok()?;
        let candidates = self.routes.snapshot(verb);
        candidates
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, candidate)| {
                candidate.matcher.match_path(&parsed.resource).map(|params| Resolved {
                    verb,
                    index,
                    context: RequestContext {
                        query: parsed.query.clone(),
                        params,
                        resource: parsed.resource.clone(),
                    },
                })
            })
    }

    fn classify(&self, route: &str) -> Result<(Verb, ParsedRoute), Dispatch> {
        let Some(parsed) = parser::parse(route) else {
            tracing::trace!(route = %route, "Invalid route");
            return Err(Dispatch::Unparsable);
        };
        let Some(verb) = self.verbs.load().classify(&parsed.verb_expression) else {
            tracing::trace!(verb_expression = %parsed.verb_expression, "Invalid verb");
            return Err(Dispatch::UnknownVerb);
        };
        Ok((verb, parsed))
    }
}

impl<C: 'static> Default for Router<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(Verb, usize)> = Verb::ALL
            .iter()
            .map(|verb| (*verb, self.routes.len(*verb)))
            .collect();
        f.debug_struct("Router")
            .field("routes", &counts)
            .field("verbs", &*self.verbs.load_full())
            .finish()
    }
}
