//! Per-verb route storage.
//!
//! # Design Decisions
//! - Append-only; no unregister
//! - Each verb's list is an `ArcSwap` snapshot: registration copies and
//!   swaps, dispatch iterates whatever snapshot it loaded, so a concurrent
//!   append is never seen half-done

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::handler::Handler;
use crate::routing::matcher::Matcher;
use crate::routing::verb::Verb;

/// A matcher paired with the handler it routes to.
pub struct RegisteredRoute<C> {
    pub matcher: Box<dyn Matcher>,
    pub handler: Arc<dyn Handler<C>>,
}

impl<C> fmt::Debug for RegisteredRoute<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredRoute")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// Immutable view of one verb's routes, oldest first.
pub type RouteList<C> = Arc<Vec<Arc<RegisteredRoute<C>>>>;

/// Registered routes grouped by verb, in insertion order.
pub struct RouteTable<C> {
    lists: [ArcSwap<Vec<Arc<RegisteredRoute<C>>>>; 4],
}

impl<C> RouteTable<C> {
    pub fn new() -> Self {
        Self {
            lists: std::array::from_fn(|_| ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Append a route to `verb`'s list.
    pub fn push(&self, verb: Verb, route: RegisteredRoute<C>) {
        let route = Arc::new(route);
        self.lists[verb.index()].rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&route));
            next
        });
    }

    /// Current snapshot of `verb`'s routes.
    pub fn snapshot(&self, verb: Verb) -> RouteList<C> {
        self.lists[verb.index()].load_full()
    }

    pub fn len(&self, verb: Verb) -> usize {
        self.lists[verb.index()].load().len()
    }

    pub fn total(&self) -> usize {
        Verb::ALL.iter().map(|verb| self.len(*verb)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl<C> Default for RouteTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
