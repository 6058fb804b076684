//! Transport port - how messages physically reach the bus.
//!
//! The dispatcher never talks to a transport. The [`Framework`](crate::Framework)
//! declares the exchange and queues at bootstrap and publishes through it; a
//! [`ConsumerWorker`](crate::worker::ConsumerWorker) consumes a queue,
//! decodes with a [`MessageCodec`] and submits to the bus.
//!
//! ```text
//! publish(&M) ──► MessageCodec::encode ──► Transport::publish ──► queue
//!                                                                    │
//! Framework::submit ◄── MessageCodec::decode ◄── ConsumerWorker ◄────┘
//! ```

mod codec;
mod in_memory;
mod transport;

pub use codec::{headers, MessageCodec};
pub use in_memory::InMemoryTransport;
pub use transport::{ConsumerId, Delivery, ExchangeKind, Transport, TransportError, WireMessage};
