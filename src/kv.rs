//! In-memory key/value resource served by the demo binary.
//!
//! | Route | Arguments | Reply |
//! |---|---|---|
//! | `/kv/create` (`?key=` optional) | `[value]` | `[null, key]` |
//! | `/kv/:key/read` | none | `[null, value]` |
//! | `/kv/:key/update` | `[value]` | `[null, previous]` |
//! | `/kv/:key/delete` | none | `[null, removed]` |
//!
//! Failures reply with a single error string, e.g. `["not found"]`.
//! A key must be addressable as a `:key` segment: non-empty, made of
//! `[A-Za-z0-9-_~ %]`.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use thiserror::Error;

use crate::routing::{
    is_segment_value, HandlerResult, InvalidRouteError, Payload, RequestContext, Router,
};

const NOT_FOUND: &str = "not found";
const MISSING_VALUE: &str = "missing value";

/// Why an entry could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("invalid key")]
    InvalidKey,

    #[error("key exists")]
    KeyExists,
}

/// Shared concurrent store. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    entries: Arc<DashMap<String, Value>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Insert under `key`, or a fresh UUID when `None`.
    pub fn create(&self, key: Option<&str>, value: Value) -> Result<String, CreateError> {
        let key = match key {
            Some(key) if is_segment_value(key) => key.to_string(),
            Some(_) => return Err(CreateError::InvalidKey),
            None => uuid::Uuid::new_v4().to_string(),
        };
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => Err(CreateError::KeyExists),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(key)
            }
        }
    }

    /// Replace an existing value, returning the previous one.
    pub fn update(&self, key: &str, value: Value) -> Option<Value> {
        self.entries
            .get_mut(key)
            .map(|mut entry| std::mem::replace(entry.value_mut(), value))
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Mount the CRUD routes on `router`.
    pub fn register<C: 'static>(&self, router: &Router<C>) -> Result<(), InvalidRouteError> {
        let store = self.clone();
        router.post("/kv", move |req: RequestContext, _conn: &C, mut payload: Payload| {
            let Some(value) = payload.arg(0).cloned() else {
                return reply_err(&mut payload, MISSING_VALUE);
            };
            match store.create(req.query("key"), value) {
                Ok(key) => {
                    tracing::debug!(key = %key, "Entry created");
                    reply_ok(&mut payload, json!(key))
                }
                Err(e) => reply_err(&mut payload, &e.to_string()),
            }
        })?;

        let store = self.clone();
        router.get("/kv/:key", move |req: RequestContext, _conn: &C, mut payload: Payload| {
            match store.get(key_of(&req)) {
                Some(value) => reply_ok(&mut payload, value),
                None => reply_err(&mut payload, NOT_FOUND),
            }
        })?;

        let store = self.clone();
        router.put("/kv/:key", move |req: RequestContext, _conn: &C, mut payload: Payload| {
            let Some(value) = payload.arg(0).cloned() else {
                return reply_err(&mut payload, MISSING_VALUE);
            };
            match store.update(key_of(&req), value) {
                Some(previous) => reply_ok(&mut payload, previous),
                None => reply_err(&mut payload, NOT_FOUND),
            }
        })?;

        let store = self.clone();
        router.delete("/kv/:key", move |req: RequestContext, _conn: &C, mut payload: Payload| {
            match store.remove(key_of(&req)) {
                Some(removed) => reply_ok(&mut payload, removed),
                None => reply_err(&mut payload, NOT_FOUND),
            }
        })?;

        Ok(())
    }
}

fn key_of(req: &RequestContext) -> &str {
    req.param("key").unwrap_or_default()
}

fn reply_ok(payload: &mut Payload, value: Value) -> HandlerResult {
    payload.reply(vec![Value::Null, value]);
    Ok(())
}

fn reply_err(payload: &mut Payload, message: &str) -> HandlerResult {
    payload.reply(vec![json!(message)]);
    Ok(())
}
