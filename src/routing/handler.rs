//! Handler contract.
//!
//! A handler receives the request context, the connection handle the message
//! arrived on, and the remaining message arguments as a [`Payload`]. Handlers
//! are invoked synchronously; any asynchronous work (a deferred reply, for
//! instance) is theirs to spawn. The payload carries however many arguments
//! the client sent and the handler is responsible for checking their count
//! and types.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::routing::error::HandlerError;

/// Result returned by a handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Request information passed to a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    /// Decoded query string parameters.
    pub query: HashMap<String, String>,
    /// Parameters captured by the matched pattern.
    pub params: HashMap<String, String>,
    /// The resource path that was matched.
    pub resource: String,
}

impl RequestContext {
    /// Path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Query parameter by name.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Callback that answers the message a handler is processing.
pub struct Reply(Box<dyn FnOnce(Vec<Value>) + Send>);

impl Reply {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Vec<Value>) + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Send the reply. Consumes the callback, so a message is answered at most once.
    pub fn send(self, args: Vec<Value>) {
        (self.0)(args)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply(..)")
    }
}

/// Message arguments following the route string, plus the optional reply callback.
#[derive(Debug, Default)]
pub struct Payload {
    args: Vec<Value>,
    reply: Option<Reply>,
}

impl Payload {
    pub fn new(args: Vec<Value>) -> Self {
        Self { args, reply: None }
    }

    /// Attach a reply callback.
    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn has_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Take the reply callback, leaving `None` behind.
    pub fn take_reply(&mut self) -> Option<Reply> {
        self.reply.take()
    }

    /// Answer the message if a reply callback is attached. Returns whether one was.
    pub fn reply(&mut self, args: Vec<Value>) -> bool {
        match self.reply.take() {
            Some(reply) => {
                reply.send(args);
                true
            }
            None => false,
        }
    }

    pub fn into_parts(self) -> (Vec<Value>, Option<Reply>) {
        (self.args, self.reply)
    }
}

impl From<Vec<Value>> for Payload {
    fn from(args: Vec<Value>) -> Self {
        Self::new(args)
    }
}

/// A route handler for connections of type `C`.
pub trait Handler<C>: Send + Sync {
    fn call(&self, req: RequestContext, conn: &C, payload: Payload) -> HandlerResult;
}

impl<C, F> Handler<C> for F
where
    F: Fn(RequestContext, &C, Payload) -> HandlerResult + Send + Sync,
{
    fn call(&self, req: RequestContext, conn: &C, payload: Payload) -> HandlerResult {
        self(req, conn, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_reply_fires_once() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let mut payload = Payload::new(vec![json!(1)])
            .with_reply(Reply::new(move |args| sink.lock().unwrap().push(args)));

        assert!(payload.has_reply());
        assert!(payload.reply(vec![json!("ok")]));
        assert!(!payload.reply(vec![json!("again")]));
        assert_eq!(*sent.lock().unwrap(), vec![vec![json!("ok")]]);
    }

    #[test]
    fn test_payload_accessors() {
        let payload = Payload::from(vec![json!("/new-image-path"), json!(false)]);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.arg(0), Some(&json!("/new-image-path")));
        assert_eq!(payload.arg(2), None);
        assert!(!payload.has_reply());
        assert!(Payload::default().is_empty());
    }

    #[test]
    fn test_request_context_lookup() {
        let mut req = RequestContext::default();
        req.params.insert("id".into(), "4".into());
        req.query.insert("crop".into(), "true".into());
        assert_eq!(req.param("id"), Some("4"));
        assert_eq!(req.query("crop"), Some("true"));
        assert_eq!(req.param("missing"), None);
    }
}
