//! Message header: correlation id, schema version and routing metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Routing metadata carried by every message.
///
/// Used by transports; the dispatcher never interprets it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Routing key used when the message is published.
    #[serde(default)]
    pub routing_key: String,
    /// Opaque transport payload (headers, tracing context, ...).
    #[serde(default)]
    pub payload: HashMap<String, Value>,
}

impl Metadata {
    pub fn new(routing_key: impl Into<String>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: HashMap::new(),
        }
    }

    /// Add an entry to the opaque payload.
    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// Header shared by commands, events and responses.
///
/// The correlation id is the idempotency key: two headers are equal when
/// their correlation ids are equal, whatever the rest of the message holds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Header {
    #[serde(default = "Uuid::new_v4")]
    pub correlation_id: Uuid,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Header {
    /// A header with a fresh random correlation id and version 0.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            version: 0,
            metadata: Metadata::default(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.metadata.routing_key = routing_key.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.correlation_id == other.correlation_id
    }
}

impl Eq for Header {}
