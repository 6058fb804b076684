//! Transport port and the wire message it carries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::QueueBinding;

/// A message as it travels over a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireMessage {
    /// Unique identifier for this delivery (the correlation id when encoded by the codec)
    pub id: String,
    /// Message name used to pick a decoder (e.g., "CreateUser")
    pub message_type: String,
    /// Key the exchange routes on
    pub routing_key: String,
    /// Serialized payload
    pub payload: Vec<u8>,
    /// Transport headers
    pub headers: Vec<(String, String)>,
}

impl WireMessage {
    pub fn new(
        id: impl Into<String>,
        message_type: impl Into<String>,
        routing_key: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            routing_key: routing_key.into(),
            payload,
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// First header value stored under `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// How an exchange matches routing keys against queue bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Binding key equals the routing key.
    #[default]
    Direct,
    /// Every bound queue receives every message.
    Fanout,
    /// Dot separated words; `*` matches one word, `#` zero or more.
    Topic,
}

impl ExchangeKind {
    /// Whether a queue bound with `binding_key` receives a message published
    /// with `routing_key`.
    pub fn matches(self, binding_key: &str, routing_key: &str) -> bool {
        match self {
            ExchangeKind::Direct => binding_key == routing_key,
            ExchangeKind::Fanout => true,
            ExchangeKind::Topic => {
                let pattern: Vec<&str> = binding_key.split('.').collect();
                let words: Vec<&str> = routing_key.split('.').collect();
                topic_matches(&pattern, &words)
            }
        }
    }
}

fn topic_matches(pattern: &[&str], words: &[&str]) -> bool {
    match (pattern.first(), words.first()) {
        (None, None) => true,
        (Some(&"#"), _) => {
            topic_matches(&pattern[1..], words)
                || (!words.is_empty() && topic_matches(pattern, &words[1..]))
        }
        (Some(&"*"), Some(_)) => topic_matches(&pattern[1..], &words[1..]),
        (Some(p), Some(w)) if p == w => topic_matches(&pattern[1..], &words[1..]),
        _ => false,
    }
}

impl FromStr for ExchangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            other => Err(format!("unsupported exchange type '{other}'")),
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
        };
        f.write_str(name)
    }
}

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not initialized")]
    NotInitialized,

    #[error("transport is closed")]
    Closed,

    #[error("no exchange declared")]
    NoExchange,

    #[error("unknown queue '{0}'")]
    UnknownQueue(String),

    /// The consumer could not accept the message right now.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The consumer is gone for good and should be detached.
    #[error("consumer detached")]
    Detached,

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("transport lock poisoned")]
    LockPoisoned,
}

/// Consumer callback. Returning an error leaves the message with the
/// transport; [`TransportError::Detached`] also removes the consumer.
pub type Delivery = Box<dyn Fn(WireMessage) -> Result<(), TransportError> + Send + Sync>;

/// Handle for an attached consumer, used to detach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(pub u64);

/// Port to the message broker.
///
/// Implementations might include:
/// - `InMemoryTransport` - For testing and single-process scenarios
/// - an AMQP transport - For RabbitMQ
pub trait Transport: Send + Sync {
    /// Open connections. Calling it again is a no-op.
    fn initialize(&self) -> Result<(), TransportError>;

    fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), TransportError>;

    /// Declare queues and bind them to the declared exchange.
    fn declare_queues(&self, queues: &[QueueBinding]) -> Result<(), TransportError>;

    fn publish(&self, routing_key: &str, message: WireMessage) -> Result<(), TransportError>;

    /// Attach a consumer to `queue`. Messages held for the queue are
    /// offered to it straight away.
    fn consume(&self, queue: &str, delivery: Delivery) -> Result<ConsumerId, TransportError>;

    /// Detach a consumer. Detaching an unknown consumer is a no-op.
    fn cancel(&self, queue: &str, consumer: ConsumerId) -> Result<(), TransportError>;

    /// Offer messages held for `queue` to its consumers again, in order,
    /// until one is refused.
    fn flush(&self, queue: &str) -> Result<(), TransportError>;

    /// Close connections and detach consumers. Calling it again is a no-op.
    fn close(&self) -> Result<(), TransportError>;
}
