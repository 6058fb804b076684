//! JSON codec between typed messages and `WireMessage`.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::transport::{TransportError, WireMessage};
use crate::error::BusError;
use crate::message::{Message, Named};

type Decoder = fn(&[u8]) -> Result<Box<dyn Message>, serde_json::Error>;

fn decode_as<M: Message + DeserializeOwned>(bytes: &[u8]) -> Result<Box<dyn Message>, serde_json::Error> {
    Ok(Box::new(serde_json::from_slice::<M>(bytes)?))
}

/// Header keys set by [`MessageCodec::encode`].
pub mod headers {
    pub const CORRELATION_ID: &str = "correlation_id";
    pub const VERSION: &str = "version";
    pub const KIND: &str = "kind";
}

/// Decoders keyed by message name.
///
/// A consumer only understands the message types registered here; anything
/// else fails with `UnknownMessageType`.
#[derive(Default, Clone)]
pub struct MessageCodec {
    decoders: HashMap<&'static str, Decoder>,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Teach the codec to decode `M`.
    pub fn register<M>(mut self) -> Self
    where
        M: Message + Named + DeserializeOwned,
    {
        self.decoders.insert(M::NAME, decode_as::<M>);
        self
    }

    pub fn knows(&self, message_type: &str) -> bool {
        self.decoders.contains_key(message_type)
    }

    /// Serialize `message` to JSON.
    ///
    /// The routing key comes from the header metadata, falling back to the
    /// message name.
    pub fn encode<M>(message: &M) -> Result<WireMessage, TransportError>
    where
        M: Message + Named + Serialize,
    {
        let header = message.header();
        let payload =
            serde_json::to_vec(message).map_err(|e| TransportError::Encode(e.to_string()))?;
        let routing_key = if header.metadata.routing_key.is_empty() {
            M::NAME
        } else {
            header.metadata.routing_key.as_str()
        };

        Ok(
            WireMessage::new(header.correlation_id.to_string(), M::NAME, routing_key, payload)
                .with_header(headers::CORRELATION_ID, header.correlation_id.to_string())
                .with_header(headers::VERSION, header.version.to_string())
                .with_header(headers::KIND, format!("{:?}", message.kind())),
        )
    }

    /// Rebuild the typed message carried by `wire`.
    pub fn decode(&self, wire: &WireMessage) -> Result<Box<dyn Message>, BusError> {
        let decoder = self
            .decoders
            .get(wire.message_type.as_str())
            .ok_or_else(|| BusError::UnknownMessageType(wire.message_type.clone()))?;
        decoder(&wire.payload).map_err(|e| BusError::Decode {
            message_type: wire.message_type.clone(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for MessageCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.decoders.keys().collect();
        names.sort_unstable();
        f.debug_struct("MessageCodec").field("decoders", &names).finish()
    }
}
