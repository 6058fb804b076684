// Lets the message derives refer to `message_bus::...` from inside this crate too.
extern crate self as message_bus;

pub mod bus;
pub mod config;
mod error;
pub mod framework;
pub mod handler;
pub mod lock;
pub mod logging;
pub mod message;
pub mod persistence;
pub mod registry;
pub mod transport;
pub mod worker;

pub use bus::{Bus, ErrorHandlers, RecoveryFn};
pub use config::{BusConfig, ConfigError, QueueBinding};
pub use error::{BusError, ErrorKind, HandlerError};
pub use framework::Framework;
pub use handler::{Dependencies, DependencyRegistry, Handler, HandlerType};
pub use message::{
    reply, Command, CommandResponse, Event, Header, Message, MessageKind, Metadata, Named, Reply,
};
pub use persistence::{InMemoryPersistence, Persistence, PersistenceError};
pub use registry::{HandlerRegistry, HandlerSummary};
pub use transport::{
    ConsumerId, ExchangeKind, InMemoryTransport, MessageCodec, Transport, TransportError,
    WireMessage,
};
pub use worker::{ConsumerWorker, WorkerOptions, WorkerStats};

// Derive macros share names with the marker traits they implement.
pub use message_bus_macros::{Command, CommandResponse, Event};
