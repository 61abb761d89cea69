//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::{Verb, VerbTable};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, WebSocket endpoint, limits).
    pub listener: ListenerConfig,

    /// Verb synonym table.
    pub verbs: VerbsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// HTTP path that accepts WebSocket upgrades.
    pub path: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Largest accepted inbound message, in bytes.
    pub max_message_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            path: "/ws".to_string(),
            max_connections: 10_000,
            max_message_bytes: 64 * 1024,
        }
    }
}

/// Tokens accepted for each verb.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VerbsConfig {
    pub post: Vec<String>,
    pub get: Vec<String>,
    pub put: Vec<String>,
    pub delete: Vec<String>,
}

impl VerbsConfig {
    /// Tokens configured for `verb`.
    pub fn tokens(&self, verb: Verb) -> &[String] {
        match verb {
            Verb::Post => &self.post,
            Verb::Get => &self.get,
            Verb::Put => &self.put,
            Verb::Delete => &self.delete,
        }
    }

    /// Build the synonym table used by the router.
    pub fn to_table(&self) -> VerbTable {
        Verb::ALL
            .iter()
            .fold(VerbTable::empty(), |table, verb| {
                table.with_synonyms(*verb, self.tokens(*verb))
            })
    }
}

impl Default for VerbsConfig {
    fn default() -> Self {
        let table = VerbTable::default();
        Self {
            post: table.synonyms(Verb::Post).to_vec(),
            get: table.synonyms(Verb::Get).to_vec(),
            put: table.synonyms(Verb::Put).to_vec(),
            delete: table.synonyms(Verb::Delete).to_vec(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// One JSON object per line for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
